use std::io::Write;

use polycast::config::Config;
use polycast::prelude::*;

define_facet! {
    interface Setting {
        prop value: i64;
    }
}

#[test]
fn entities_start_locked_when_configured() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, r#"{{ "lock_new_entities": true }}"#).unwrap();

    let config = Config::from_file(file.path()).unwrap();
    assert!(config.lock_new_entities);
    assert_eq!(config.log_level, None);

    let context = Context::with_config(config);
    let entity = context.new_entity();
    assert!(entity.is_locked());
    let setting = entity.act_like::<dyn Setting>().unwrap();
    assert!(matches!(setting.set_value(1), Err(PolycastError::InstanceLocked)));
    assert_eq!(setting.value(), 0);

    entity.unlock();
    setting.set_value(1).unwrap();
    assert_eq!(setting.value(), 1);
}

#[test]
fn bad_configuration_files_are_reported() {
    let dir = tempfile::tempdir().unwrap();
    assert!(matches!(
        Config::from_file(&dir.path().join("missing.json")),
        Err(PolycastError::IoError(_))
    ));

    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, r#"{{ "lock_everything": true }}"#).unwrap();
    assert!(matches!(
        Config::from_file(file.path()),
        Err(PolycastError::JsonError(_))
    ));
}
