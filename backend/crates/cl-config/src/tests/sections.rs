use crate::tests::{EnvGuard, setup_config_dir, write_config};
use crate::{Config, DispatchConfig, LoggingConfig, MultiplexConfig, ServerConfig};

use std::time::Duration;

use googletest::assert_that;
use googletest::prelude::{anything, eq, err, ok};
use serial_test::serial;

// =========================================================================
// Multiplex
// =========================================================================

#[test]
fn given_close_timeout_ms_when_close_timeout_then_duration() {
    let config = MultiplexConfig {
        close_timeout_ms: 1500,
    };

    assert_that!(config.close_timeout(), eq(Duration::from_millis(1500)));
}

#[test]
#[serial]
fn given_close_timeout_too_large_when_validate_then_error() {
    // Given
    let _temp = setup_config_dir();
    let _timeout = EnvGuard::set("CL_MUX_CLOSE_TIMEOUT_MS", "600000");

    // When
    let config = Config::load().unwrap();

    // Then
    assert_that!(config.validate(), err(anything()));
}

#[test]
fn given_close_timeout_too_small_when_validate_then_error() {
    let config = MultiplexConfig {
        close_timeout_ms: 1,
    };

    assert_that!(config.validate(), err(anything()));
}

// =========================================================================
// Dispatch
// =========================================================================

#[test]
fn given_empty_priority_type_when_validate_then_error() {
    let config = DispatchConfig {
        priority_types: vec![String::from("  ")],
    };

    assert_that!(config.validate(), err(anything()));
}

#[test]
fn given_private_priority_type_when_validate_then_error() {
    let config = DispatchConfig {
        priority_types: vec![String::from("_internal.stop")],
    };

    assert_that!(config.validate(), err(anything()));
}

#[test]
fn given_no_priority_types_when_validate_then_ok() {
    let config = DispatchConfig {
        priority_types: Vec::new(),
    };

    assert_that!(config.validate(), ok(anything()));
}

// =========================================================================
// Server
// =========================================================================

#[test]
fn given_privileged_port_when_validate_then_error() {
    let config = ServerConfig {
        port: 80,
        ..ServerConfig::default()
    };

    assert_that!(config.validate(), err(anything()));
}

#[test]
fn given_ephemeral_port_zero_when_validate_then_ok() {
    let config = ServerConfig {
        port: 0,
        ..ServerConfig::default()
    };

    assert_that!(config.validate(), ok(anything()));
}

#[test]
fn given_metrics_port_equal_to_server_port_when_validate_then_error() {
    let config = ServerConfig {
        port: 9000,
        metrics_port: 9000,
        ..ServerConfig::default()
    };

    assert_that!(config.validate(), err(anything()));
}

#[test]
fn given_relative_ws_path_when_validate_then_error() {
    let config = ServerConfig {
        ws_path: String::from("ws"),
        ..ServerConfig::default()
    };

    assert_that!(config.validate(), err(anything()));
}

// =========================================================================
// Logging
// =========================================================================

#[test]
fn given_log_file_with_path_traversal_when_validate_then_error() {
    let config = LoggingConfig {
        file: Some(String::from("../escape.log")),
        ..LoggingConfig::default()
    };

    assert_that!(config.validate(), err(anything()));
}

#[test]
#[serial]
fn given_logging_table_when_load_then_dir_and_file_read() {
    // Given
    let (temp, _guard) = setup_config_dir();
    let _file = EnvGuard::remove("CL_LOG_FILE");
    write_config(
        &temp,
        r#"
            [logging]
            dir = "logs"
            file = "cl.log"
            colored = false
        "#,
    );

    // When
    let config = Config::load().unwrap();

    // Then
    assert_that!(config.logging.dir, eq("logs"));
    assert_that!(config.logging.file.as_deref(), eq(Some("cl.log")));
    assert_that!(config.logging.colored, eq(false));
}
