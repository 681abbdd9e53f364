/// Get the version string for rel and librel
pub fn get_version_string() -> String {
    format!(
        "rel {}\nlibrel {}",
        env!("CARGO_PKG_VERSION"),
        librel::version()
    )
}

/// Print version information to stdout
pub fn print_version() {
    println!("{}", get_version_string());
}

#[cfg(test)]
#[path = "version_tests.rs"]
mod tests;
