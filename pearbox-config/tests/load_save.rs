use pearbox_config::{FORCE_BOOT_METHOD, IdeDevice, LoadError, NicDevice, ParseError, VmConfig};

use std::fs;

const PPCCFG: &str = r#"
# PearPC configuration
ppc_start_resolution = "1024x768x32"
ppc_start_full_screen = 0
redraw_interval_msec = 40

key_compose_dialog = "F11"
key_toggle_full_screen = "Ctrl+Alt+Return"

prom_bootmethod = "select"
prom_env_machargs = "-v"
prom_driver_graphic = "video.x"

cpu_pvr = 0x000c0201
page_table_pa = 0x00300000
memory_size = 0x10000000

pci_ide0_master_installed = 1
pci_ide0_master_image = "HD1.img"
pci_ide0_master_type = "hd"

pci_ide0_slave_installed = 1
pci_ide0_slave_image = "/dev/cdrom"
pci_ide0_slave_type = "native"

pci_3c90x_installed = 0
pci_rtl8139_installed = 1
pci_rtl8139_mac = "de:ad:ca:fe:12:34"

pci_usb_installed = 1
pci_serial_installed = 0
nvram_file = "nvram"
"#;

#[test]
fn load_sample_configuration() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ppccfg.ppc");
    fs::write(&path, PPCCFG).unwrap();

    let config = VmConfig::load(&path).unwrap();

    assert_eq!(config.resolution, "1024x768x32");
    assert_eq!(config.redraw_interval_ms, 40);
    assert_eq!(config.memory_size, 256 * 1024 * 1024);
    assert_eq!(config.prom_bootmethod, "select");
    assert_eq!(config.prom_env_machargs, "-v");
    assert_eq!(
        config.ide0_master,
        IdeDevice {
            installed: 1,
            kind: Some("hd".into()),
            image: Some("HD1.img".into()),
        }
    );
    assert_eq!(config.ide0_slave.image.as_deref(), Some("/dev/cdrom"));
    assert_eq!(
        config.nic_rtl8139,
        NicDevice {
            installed: 1,
            mac: Some("de:ad:ca:fe:12:34".into()),
        }
    );
    assert_eq!(config.usb_installed, 1);
    assert_eq!(config.serial_installed, 0);

    // Keys missing from the file keep their defaults.
    assert_eq!(config.key_toggle_mouse_grab, "F12");
    assert_eq!(config.key_change_cd_1, "none");
}

#[test]
fn save_then_load_gives_same_config() {
    let dir = tempfile::tempdir().unwrap();
    let original = dir.path().join("ppccfg.ppc");
    let saved = dir.path().join("newcfg.ppc");
    fs::write(&original, PPCCFG).unwrap();

    let config = VmConfig::load(&original).unwrap();
    config.save(&saved).unwrap();

    assert_eq!(VmConfig::load(&saved).unwrap(), config);
}

#[test]
fn forced_boot_settings_survive_save() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("force.ppc");

    let config = VmConfig {
        prom_bootmethod: FORCE_BOOT_METHOD.into(),
        prom_loadfile: Some("yaboot".into()),
        prom_env_bootpath: Some("hd:3,\\\\yaboot".into()),
        ..VmConfig::default()
    };

    config.save(&path).unwrap();
    let loaded = VmConfig::load(&path).unwrap();

    assert_eq!(loaded, config);
    assert_eq!(
        loaded.boot_override(),
        Some((Some("yaboot"), Some("hd:3,\\\\yaboot")))
    );
}

#[test]
fn multiline_strings_survive_save() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("args.ppc");

    let config = VmConfig {
        prom_env_bootargs: "-v\ndebug=0x144".into(),
        prom_env_machargs: "a\tb\r\n".into(),
        ..VmConfig::default()
    };

    assert_eq!(VmConfig::parse(&config.to_config_string()).unwrap(), config);

    config.save(&path).unwrap();
    assert_eq!(VmConfig::load(&path).unwrap(), config);
}

#[test]
fn flag_values_are_kept_as_written() {
    let config = VmConfig::parse(
        "ppc_start_full_screen = 2\npci_usb_installed = 7\npci_ide0_master_installed = 3\n",
    )
    .unwrap();

    assert_eq!(config.full_screen, 2);
    assert_eq!(config.usb_installed, 7);
    assert_eq!(config.ide0_master.installed, 3);

    let text = config.to_config_string();
    assert!(text.contains("ppc_start_full_screen = 2\n"));
    assert_eq!(VmConfig::parse(&text).unwrap(), config);
}

#[test]
fn boot_settings_are_dropped_without_force() {
    let config = VmConfig {
        prom_loadfile: Some("yaboot".into()),
        ..VmConfig::default()
    };

    let text = config.to_config_string();

    assert!(!text.contains("prom_loadfile"));
    assert_eq!(VmConfig::parse(&text).unwrap().prom_loadfile, None);
}

#[test]
fn load_reports_path_and_line() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.ppc");
    fs::write(&path, "memory_size = 1\nmemory_size = \"big\"\n").unwrap();

    let err = VmConfig::load(&path).unwrap_err();

    match err {
        LoadError::Parse { path: p, source } => {
            assert_eq!(p, path);
            assert_eq!(
                source,
                ParseError::DuplicateKey {
                    line: 2,
                    key: "memory_size".into()
                }
            );
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn type_mismatch_is_an_error() {
    let err = VmConfig::parse("memory_size = \"big\"\n").unwrap_err();
    assert!(matches!(err, ParseError::ExpectedInteger { line: 1, .. }));

    let err = VmConfig::parse("nvram_file = 3\n").unwrap_err();
    assert!(matches!(err, ParseError::ExpectedString { line: 1, .. }));
}

#[test]
fn missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let err = VmConfig::load(dir.path().join("absent.ppc")).unwrap_err();
    assert!(matches!(err, LoadError::ReadFile { .. }));
}
