fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Only search for libmediapipe if the native engine is enabled
    #[cfg(feature = "mediapipe")]
    {
        use std::path::PathBuf;

        // Directory holding libmediapipe (built from the mediapipe C API wrapper)
        if let Some(lib_dir) = std::env::var_os("MEDIAPIPE_LIB_DIR") {
            let lib_dir = PathBuf::from(lib_dir);
            if !lib_dir.is_dir() {
                return Err(format!("MEDIAPIPE_LIB_DIR is not a directory: {}", lib_dir.display()).into());
            }
            println!("cargo:rustc-link-search=native={}", lib_dir.display());
        }
    }

    println!("cargo:rerun-if-env-changed=MEDIAPIPE_LIB_DIR");
    println!("cargo:rerun-if-changed=build.rs");
    Ok(())
}
