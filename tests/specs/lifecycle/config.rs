//! Configuration specs

use crate::prelude::*;
use std::io::Write;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn drumline_from_config_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        "name = \"render\"\nbuffer = 2\nreset_timeout = \"50ms\""
    )
    .unwrap();

    let config = DrumlineConfig::load(file.path()).unwrap();
    let dl = Drumline::with_config(config);
    dl.register(0).unwrap();
    dl.register(1).unwrap();

    let stats = dl.stats();
    assert_eq!(stats.name, "render");
    assert_eq!(stats.buffer, 2);
    assert_eq!(dl.config().reset_timeout, Duration::from_millis(50));
    dl.close().await.unwrap();
}

#[test]
fn malformed_config_is_reported() {
    let err = DrumlineConfig::from_toml("buffer = \"many\"").unwrap_err();
    assert!(matches!(err, DrumlineError::Config(_)));
}
