//! Library for loading and saving PearPC virtual machine configuration files.
//!
//! PearPC reads a flat `key = value` file with a fixed set of keys. This crate
//! maps that file onto [`VmConfig`], filling in PearPC's defaults for keys the
//! file leaves out, and writes it back in a stable, grouped order.
//!
//! # Example
//!
//! ```no_run
//! use pearbox_config::VmConfig;
//!
//! let mut config = VmConfig::load("ppccfg.ppc").unwrap();
//! config.ide0_master.installed = 1;
//! config.ide0_master.image = Some("HD1.img".into());
//! config.save("newcfg.ppc").unwrap();
//! ```

mod parse;

pub use self::parse::ParseError;

use self::parse::{Entry, entries, quote};
use snafu::{ResultExt, Snafu, ensure};
use std::collections::HashSet;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Errors for [`VmConfig::load()`].
#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum LoadError {
    #[snafu(display("cannot read {}", path.display()))]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("cannot parse {}", path.display()))]
    Parse { path: PathBuf, source: ParseError },
}

/// Errors for [`VmConfig::save()`].
#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum SaveError {
    #[snafu(display("cannot write {}", path.display()))]
    WriteFile {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Boot method that makes PearPC load a file directly instead of probing.
pub const FORCE_BOOT_METHOD: &str = "force";

/// An IDE device slot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdeDevice {
    /// Non-zero when the device is present.
    pub installed: u32,
    /// Device type, e.g. `hd` or `cdrom`.
    pub kind: Option<String>,
    /// Path of the backing image.
    pub image: Option<String>,
}

/// A network card slot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NicDevice {
    /// Non-zero when the card is present.
    pub installed: u32,
    pub mac: Option<String>,
}

/// Virtual machine configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VmConfig {
    // Screen
    pub resolution: String,
    pub full_screen: u32,
    pub redraw_interval_ms: u32,

    // Memory
    pub memory_size: u32,

    // CPU
    pub cpu_pvr: u32,
    pub page_table_pa: u32,

    // Key codes
    pub key_compose_dialog: String,
    pub key_change_cd_0: String,
    pub key_change_cd_1: String,
    pub key_toggle_mouse_grab: String,
    pub key_toggle_full_screen: String,

    // Loader (PROM)
    pub prom_bootmethod: String,
    pub prom_env_bootpath: Option<String>,
    pub prom_env_bootargs: String,
    pub prom_env_machargs: String,
    pub prom_loadfile: Option<String>,
    pub prom_driver_graphic: String,

    // Devices
    pub ide0_master: IdeDevice,
    pub ide0_slave: IdeDevice,
    pub nic_3c90x: NicDevice,
    pub nic_rtl8139: NicDevice,
    pub usb_installed: u32,
    pub serial_installed: u32,

    pub nvram_file: String,
}

impl Default for VmConfig {
    fn default() -> Self {
        Self {
            resolution: "800x600x15".into(),
            full_screen: 0,
            redraw_interval_ms: 20,
            memory_size: 128 * 1024 * 1024,
            cpu_pvr: 0x000c0201,
            page_table_pa: 0x00300000,
            key_compose_dialog: "F11".into(),
            key_change_cd_0: "none".into(),
            key_change_cd_1: "none".into(),
            key_toggle_mouse_grab: "F12".into(),
            key_toggle_full_screen: "Ctrl+Alt+Return".into(),
            prom_bootmethod: "auto".into(),
            prom_env_bootpath: None,
            prom_env_bootargs: String::new(),
            prom_env_machargs: String::new(),
            prom_loadfile: None,
            prom_driver_graphic: String::new(),
            ide0_master: IdeDevice::default(),
            ide0_slave: IdeDevice::default(),
            nic_3c90x: NicDevice::default(),
            nic_rtl8139: NicDevice::default(),
            usb_installed: 0,
            serial_installed: 0,
            nvram_file: "nvram".into(),
        }
    }
}

impl VmConfig {
    /// Parses configuration text, starting from the defaults.
    pub fn parse(text: &str) -> Result<Self, ParseError> {
        let mut config = Self::default();
        let mut seen = HashSet::new();

        for entry in entries(text) {
            let entry = entry?;

            ensure!(
                seen.insert(entry.key),
                parse::DuplicateKeySnafu {
                    line: entry.line,
                    key: entry.key,
                }
            );

            config.apply(entry)?;
        }

        Ok(config)
    }

    /// Reads and parses the configuration file at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).context(ReadFileSnafu { path })?;
        let config = Self::parse(&text).context(ParseSnafu { path })?;

        debug!(path = %path.display(), "configuration loaded");

        Ok(config)
    }

    /// Writes the configuration to `path`, replacing any existing file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), SaveError> {
        let path = path.as_ref();

        std::fs::write(path, self.to_config_string()).context(WriteFileSnafu { path })?;

        info!(path = %path.display(), "configuration saved");

        Ok(())
    }

    /// Gets the file to load and its boot path when the boot method is
    /// [`FORCE_BOOT_METHOD`]. Other methods ignore both settings.
    pub fn boot_override(&self) -> Option<(Option<&str>, Option<&str>)> {
        (self.prom_bootmethod == FORCE_BOOT_METHOD).then(|| {
            (
                self.prom_loadfile.as_deref(),
                self.prom_env_bootpath.as_deref(),
            )
        })
    }

    /// Serializes every setting in PearPC's section order.
    pub fn to_config_string(&self) -> String {
        let mut out = Writer(String::new());
        let force = self.prom_bootmethod == FORCE_BOOT_METHOD;

        out.section("Screen");
        out.string("ppc_start_resolution", &self.resolution);
        out.decimal("ppc_start_full_screen", self.full_screen);
        out.decimal("redraw_interval_msec", self.redraw_interval_ms);

        out.section("Key codes");
        out.string("key_compose_dialog", &self.key_compose_dialog);
        out.string("key_change_cd_0", &self.key_change_cd_0);
        out.string("key_change_cd_1", &self.key_change_cd_1);
        out.string("key_toggle_mouse_grab", &self.key_toggle_mouse_grab);
        out.string("key_toggle_full_screen", &self.key_toggle_full_screen);

        out.section("Loader (PROM)");
        out.string("prom_bootmethod", &self.prom_bootmethod);
        if force {
            out.optional("prom_loadfile", self.prom_loadfile.as_deref());
            out.optional("prom_env_bootpath", self.prom_env_bootpath.as_deref());
        }
        out.string("prom_env_bootargs", &self.prom_env_bootargs);
        out.string("prom_env_machargs", &self.prom_env_machargs);
        out.string("prom_driver_graphic", &self.prom_driver_graphic);

        out.section("CPU");
        out.hex("cpu_pvr", self.cpu_pvr);
        out.hex("page_table_pa", self.page_table_pa);

        out.section("Memory");
        out.hex("memory_size", self.memory_size);

        out.section("IDE");
        out.ide("pci_ide0_master", &self.ide0_master);
        out.ide("pci_ide0_slave", &self.ide0_slave);

        out.section("Network");
        out.nic("pci_3c90x", &self.nic_3c90x);
        out.nic("pci_rtl8139", &self.nic_rtl8139);

        out.section("USB");
        out.decimal("pci_usb_installed", self.usb_installed);

        out.section("Serial");
        out.decimal("pci_serial_installed", self.serial_installed);

        out.section("NVRAM");
        out.string("nvram_file", &self.nvram_file);

        out.0
    }

    fn apply(&mut self, entry: Entry<'_>) -> Result<(), ParseError> {
        match entry.key {
            "ppc_start_resolution" => self.resolution = entry.into_string()?,
            "ppc_start_full_screen" => self.full_screen = entry.into_integer()?,
            "redraw_interval_msec" => self.redraw_interval_ms = entry.into_integer()?,
            "memory_size" => self.memory_size = entry.into_integer()?,
            "cpu_pvr" => self.cpu_pvr = entry.into_integer()?,
            "page_table_pa" => self.page_table_pa = entry.into_integer()?,
            "key_compose_dialog" => self.key_compose_dialog = entry.into_string()?,
            "key_change_cd_0" => self.key_change_cd_0 = entry.into_string()?,
            "key_change_cd_1" => self.key_change_cd_1 = entry.into_string()?,
            "key_toggle_mouse_grab" => self.key_toggle_mouse_grab = entry.into_string()?,
            "key_toggle_full_screen" => self.key_toggle_full_screen = entry.into_string()?,
            "prom_bootmethod" => self.prom_bootmethod = entry.into_string()?,
            "prom_env_bootpath" => self.prom_env_bootpath = Some(entry.into_string()?),
            "prom_env_bootargs" => self.prom_env_bootargs = entry.into_string()?,
            "prom_env_machargs" => self.prom_env_machargs = entry.into_string()?,
            "prom_loadfile" => self.prom_loadfile = Some(entry.into_string()?),
            "prom_driver_graphic" => self.prom_driver_graphic = entry.into_string()?,
            "pci_ide0_master_installed" => self.ide0_master.installed = entry.into_integer()?,
            "pci_ide0_master_type" => self.ide0_master.kind = Some(entry.into_string()?),
            "pci_ide0_master_image" => self.ide0_master.image = Some(entry.into_string()?),
            "pci_ide0_slave_installed" => self.ide0_slave.installed = entry.into_integer()?,
            "pci_ide0_slave_type" => self.ide0_slave.kind = Some(entry.into_string()?),
            "pci_ide0_slave_image" => self.ide0_slave.image = Some(entry.into_string()?),
            "pci_3c90x_installed" => self.nic_3c90x.installed = entry.into_integer()?,
            "pci_3c90x_mac" => self.nic_3c90x.mac = Some(entry.into_string()?),
            "pci_rtl8139_installed" => self.nic_rtl8139.installed = entry.into_integer()?,
            "pci_rtl8139_mac" => self.nic_rtl8139.mac = Some(entry.into_string()?),
            "pci_usb_installed" => self.usb_installed = entry.into_integer()?,
            "pci_serial_installed" => self.serial_installed = entry.into_integer()?,
            "nvram_file" => self.nvram_file = entry.into_string()?,
            key => {
                return parse::UnknownKeySnafu {
                    line: entry.line,
                    key,
                }
                .fail();
            }
        }

        Ok(())
    }
}

/// Accumulates configuration lines.
struct Writer(String);

impl Writer {
    fn section(&mut self, name: &str) {
        if !self.0.is_empty() {
            self.0.push('\n');
        }
        let _ = writeln!(self.0, "# {name}");
    }

    fn string(&mut self, key: &str, value: &str) {
        let _ = writeln!(self.0, "{key} = {}", quote(value));
    }

    fn optional(&mut self, key: &str, value: Option<&str>) {
        if let Some(value) = value {
            self.string(key, value);
        }
    }

    fn decimal(&mut self, key: &str, value: u32) {
        let _ = writeln!(self.0, "{key} = {value}");
    }

    fn hex(&mut self, key: &str, value: u32) {
        let _ = writeln!(self.0, "{key} = 0x{value:08x}");
    }

    fn ide(&mut self, prefix: &str, device: &IdeDevice) {
        self.decimal(&format!("{prefix}_installed"), device.installed);
        self.optional(&format!("{prefix}_image"), device.image.as_deref());
        self.optional(&format!("{prefix}_type"), device.kind.as_deref());
    }

    fn nic(&mut self, prefix: &str, device: &NicDevice) {
        self.decimal(&format!("{prefix}_installed"), device.installed);
        self.optional(&format!("{prefix}_mac"), device.mac.as_deref());
    }
}
