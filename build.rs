use std::env;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::process::Command;

fn commit_info() -> String {
    let output = match Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .output()
    {
        Ok(output) if output.status.success() => output,
        _ => return String::new(),
    };
    match String::from_utf8(output.stdout) {
        Ok(hash) => format!(" ({})", hash.trim()),
        Err(_) => String::new(),
    }
}

fn main() {
    let out_dir = env::var("OUT_DIR").unwrap();
    File::create(Path::new(&out_dir).join("commit-info.txt"))
        .unwrap()
        .write_all(commit_info().as_bytes())
        .unwrap();
}
