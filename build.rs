fn main() {
    // The webview shell is optional; headless builds have nothing to generate.
    #[cfg(feature = "desktop")]
    tauri_build::build();
}
