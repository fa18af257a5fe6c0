use std::env;
use std::path::PathBuf;

// ffmpeg-next links against system FFmpeg. Linux and macOS find it through
// pkg-config; on Windows we point at a vcpkg install when one exists.
fn main() {
    for variable in ["FFMPEG_DIR", "VCPKG_ROOT", "VCPKGRS_DYNAMIC", "VCPKGRS_TRIPLET"] {
        println!("cargo:rerun-if-env-changed={variable}");
    }

    if env::var("CARGO_CFG_TARGET_OS").as_deref() != Ok("windows")
        || env::var_os("FFMPEG_DIR").is_some()
    {
        return;
    }

    let Some(ffmpeg_dir) = vcpkg_ffmpeg_dir() else {
        println!(
            "cargo:warning=framesift needs FFmpeg; set FFMPEG_DIR, or VCPKG_ROOT for a vcpkg install"
        );
        return;
    };

    if !ffmpeg_dir.exists() {
        println!(
            "cargo:warning=No vcpkg FFmpeg found at {}",
            ffmpeg_dir.display()
        );
        return;
    }

    println!(
        "cargo:warning=Using vcpkg FFmpeg at {}; export FFMPEG_DIR to silence this",
        ffmpeg_dir.display()
    );
    if env::var_os("VCPKGRS_DYNAMIC").is_none() {
        println!("cargo:warning=Dynamic vcpkg FFmpeg builds also need VCPKGRS_DYNAMIC=1");
    }
}

fn vcpkg_ffmpeg_dir() -> Option<PathBuf> {
    let root = env::var_os("VCPKG_ROOT")?;
    let triplet = env::var("VCPKGRS_TRIPLET").unwrap_or_else(|_| "x64-windows".to_string());
    Some(PathBuf::from(root).join("installed").join(triplet))
}
