use std::env;
use std::path::PathBuf;

fn main() {
    println!("cargo::rustc-check-cfg=cfg(gwtb_bridge)");
    println!("cargo:rerun-if-changed=cpp/");
    println!("cargo:rerun-if-env-changed=GWCA_SOURCE");
    println!("cargo:rerun-if-env-changed=IMGUI_SOURCE");

    // The bridge links against the game API and the D3D9 renderer
    let target_os = env::var("CARGO_CFG_TARGET_OS").unwrap();
    if target_os != "windows" {
        return;
    }

    let manifest_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR").unwrap());
    let workspace_root = manifest_dir.parent().unwrap().parent().unwrap();

    // Use third_party/ by default, allow env override
    let gwca_path = env::var("GWCA_SOURCE")
        .map(PathBuf::from)
        .unwrap_or_else(|_| workspace_root.join("third_party/GWCA"));

    let imgui_path = env::var("IMGUI_SOURCE")
        .map(PathBuf::from)
        .unwrap_or_else(|_| workspace_root.join("third_party/imgui"));

    if !gwca_path.exists() || !imgui_path.exists() {
        println!(
            "cargo:warning=GWCA ({}) or ImGui ({}) not found, building without the game bridge",
            gwca_path.display(),
            imgui_path.display()
        );
        return;
    }

    let mut build = cc::Build::new();

    build
        .cpp(true)
        .file("cpp/bridge.cpp")
        // ImGui core and the DX9 renderer
        .file(imgui_path.join("imgui.cpp"))
        .file(imgui_path.join("imgui_draw.cpp"))
        .file(imgui_path.join("imgui_tables.cpp"))
        .file(imgui_path.join("imgui_widgets.cpp"))
        .file(imgui_path.join("backends/imgui_impl_dx9.cpp"))
        .include(&imgui_path)
        .include(imgui_path.join("backends"))
        // GWCA headers
        .include(gwca_path.join("include"))
        .flag("/std:c++17")
        .flag("/EHsc")
        .define("WIN32", None)
        .define("_WINDOWS", None)
        .define("NOMINMAX", None)
        .define("WIN32_LEAN_AND_MEAN", None);

    build.compile("gwtb_bridge");

    println!("cargo:rustc-link-search={}", gwca_path.join("lib").display());
    println!("cargo:rustc-link-lib=static=gwca");
    println!("cargo:rustc-link-lib=d3d9");
    println!("cargo:rustc-cfg=gwtb_bridge");
}
