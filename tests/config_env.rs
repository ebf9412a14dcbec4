use forensic_transfer::config::{CONFIG_ENV_VAR, create_template_config, load_config};
use forensic_transfer::{
    HashAlgorithm, LogLevel, MoveBehavior, TransferConfig, default_config_path, default_log_path,
};
use serial_test::serial;
use std::fs;
use tempfile::tempdir;

struct EnvGuard;

impl EnvGuard {
    fn set(value: &std::path::Path) -> Self {
        unsafe {
            std::env::set_var(CONFIG_ENV_VAR, value);
        }
        EnvGuard
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        unsafe {
            std::env::remove_var(CONFIG_ENV_VAR);
        }
    }
}

#[test]
#[serial]
fn env_file_overrides_defaults() {
    let td = tempdir().unwrap();
    let cfg_path = td.path().join("fxfer.xml");
    fs::write(
        &cfg_path,
        r#"<config>
  <same_drive_behavior>ask</same_drive_behavior>
  <hash_algorithm>md5</hash_algorithm>
  <preserve_completed_on_failure>true</preserve_completed_on_failure>
  <log_level>debug</log_level>
</config>"#,
    )
    .unwrap();
    let _env = EnvGuard::set(&cfg_path);

    let (cfg, used) = load_config().unwrap();
    assert_eq!(used.as_deref(), Some(cfg_path.as_path()));
    assert_eq!(cfg.same_drive_behavior, MoveBehavior::AskCaller);
    assert_eq!(cfg.hash_algorithm, HashAlgorithm::Md5);
    assert!(cfg.preserve_completed_on_failure);
    assert_eq!(cfg.log_level, LogLevel::Debug);
    assert!(cfg.calculate_hashes, "unset fields keep their defaults");
}

#[test]
#[serial]
fn env_directory_resolves_to_config_xml_and_log_beside_it() {
    let td = tempdir().unwrap();
    let _env = EnvGuard::set(td.path());

    assert_eq!(default_config_path().unwrap(), td.path().join("config.xml"));
    assert_eq!(default_log_path().unwrap(), td.path().join("fxfer.log"));

    let (cfg, used) = load_config().unwrap();
    assert!(used.is_none());
    assert_eq!(cfg, TransferConfig::default());
}

#[test]
#[serial]
fn template_written_under_env_location_loads_as_defaults() {
    let td = tempdir().unwrap();
    let _env = EnvGuard::set(td.path());
    let path = default_config_path().unwrap();

    create_template_config(&path).unwrap();
    let (cfg, used) = load_config().unwrap();
    assert_eq!(used, Some(path.clone()));
    assert_eq!(cfg, TransferConfig::default());

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o600);
    }
}

#[test]
#[serial]
fn malformed_config_is_an_error() {
    let td = tempdir().unwrap();
    let cfg_path = td.path().join("bad.xml");
    fs::write(&cfg_path, "<config><completed_base>/x</completed_base></config>").unwrap();
    let _env = EnvGuard::set(&cfg_path);

    let err = load_config().unwrap_err();
    assert!(format!("{err:#}").contains("unknown field"));
}
