#![allow(dead_code)]

/// The application name
pub const NAME: &str = "gkelog";

/// The application version
pub const VERSION: &str = env!("BUILD_VERSION");

// The file has been placed here by the build script. See build.rs
include!(concat!(env!("OUT_DIR"), "/built.rs"));

lazy_static! {
    static ref LONG_VERSION: String = {
        [
            VERSION.to_string(),
            format!(" - Built:\t{}", BUILT_TIME_UTC),
            format!(" - slog-gke:\tv{}", slog_gke_version()),
            format!(" - Compiler:\t{}", RUSTC_VERSION),
            format!(" - OS/Arch:\t{}/{}", CFG_OS, CFG_TARGET_ARCH),
            format!(" - Features:\t{}", FEATURES_STR),
            format!(" - Debug:\t{}", DEBUG),
        ]
        .join("\n")
    };
}

pub fn long_version() -> &'static str {
    (*LONG_VERSION).as_str()
}

pub fn slog_gke_version() -> &'static str {
    let slog_gke_version = DEPENDENCIES.iter().find_map(|(name, version)| match *name {
        "slog-gke" => Some(version),
        _ => None,
    });
    slog_gke_version.unwrap_or(&"unknown")
}
