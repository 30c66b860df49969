use std::fs;
use std::path::Path;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use tempfile::tempdir;

const APP: &str = r#"{
    "path": "/Applications/Demo.app/Demo",
    "dylib_id": "/System/Library/PrivateFrameworks/Demo.framework/Demo",
    "build_versions": ["Platform: iOS, MinOS: 17.0, SdkVersion: 17.0"],
    "source_version": "42.0",
    "objc": {
        "classes": [
            {
                "name": "Widget",
                "superclass": "NSObject",
                "protocols": ["Copying"],
                "ivars": [{"name": "_gadget", "type": "@\"Gadget\"", "offset": 8}],
                "instance_methods": [{"name": "reload", "types": "v16@0:8"}]
            },
            {"name": "Gadget", "superclass": "NSObject"}
        ],
        "protocols": [{"name": "Copying", "id": 256}]
    }
}"#;

const CACHE: &str = r#"{
    "images": [
        {
            "path": "/usr/lib/libobjc.A.dylib",
            "address": 6442450944,
            "size": 65536,
            "functions": [
                {"start": 6442455040, "end": 6442455296, "name": "_objc_msgSend"},
                {"start": 6442459136, "end": 6442459200}
            ]
        }
    ],
    "symbols": [{"address": 6442459136, "name": "_objc_retain"}]
}"#;

const LINKED_APP: &str = r#"{
    "path": "/Applications/Linked.app/Linked",
    "imported_libraries": ["/System/Library/Frameworks/Toolkit.framework/Toolkit"],
    "objc": {"classes": [{"name": "Main", "superclass": "NSObject"}]},
    "refs": {
        "selectors": [{"offset": 4295000072, "target": 4294983680, "name": "init"}]
    }
}"#;

const PUBLIC_CACHE: &str = r#"{
    "images": [
        {
            "path": "/System/Library/Frameworks/Toolkit.framework/Toolkit",
            "objc": {"classes": [{"name": "ToolkitButton", "superclass": "NSObject"}]}
        }
    ]
}"#;

fn write_fixture(dir: &Path, name: &str, contents: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).expect("write fixture");
    path
}

#[test]
fn headers_command_writes_module() {
    let dir = tempdir().expect("tempdir");
    let app = write_fixture(dir.path(), "Demo.json", APP);
    let out = dir.path().join("out");

    cargo_bin_cmd!("objcdump")
        .arg("headers")
        .arg(&app)
        .arg("--output")
        .arg(&out)
        .arg("--jobs")
        .arg("2")
        .assert()
        .success();

    let widget = fs::read_to_string(out.join("Demo/Widget.h")).expect("Widget.h");
    assert!(widget.contains("//    - LC_SOURCE_VERSION: 42.0\n"));
    assert!(widget.contains("#include \"Copying-Protocol.h\"\n#include \"Gadget.h\"\n"));
    assert!(widget.contains("- (void)reload;"));

    let umbrella = fs::read_to_string(out.join("Demo/Demo.h")).expect("Demo.h");
    assert!(umbrella.contains(
        "#import \"Gadget.h\"\n#import \"Widget.h\"\n#import \"Copying-Protocol.h\"\n"
    ));
}

#[test]
fn headers_command_requires_cache_for_dependencies() {
    let dir = tempdir().expect("tempdir");
    let app = write_fixture(dir.path(), "Demo.json", APP);

    cargo_bin_cmd!("objcdump")
        .arg("headers")
        .arg(&app)
        .arg("--output")
        .arg(dir.path().join("out"))
        .arg("--deps")
        .assert()
        .failure()
        .stderr(predicate::str::contains("dyld shared cache is required"));
}

#[test]
fn dump_command_filters_classes() {
    let dir = tempdir().expect("tempdir");
    let app = write_fixture(dir.path(), "Demo.json", APP);

    cargo_bin_cmd!("objcdump")
        .arg("dump")
        .arg(&app)
        .arg("--class")
        .arg("^Wid")
        .assert()
        .success()
        .stdout(predicate::str::contains("@interface Widget : NSObject <Copying>"))
        .stdout(predicate::str::contains("Gadget : NSObject").not());
}

#[test]
fn dump_command_follows_public_frameworks() {
    let dir = tempdir().expect("tempdir");
    let app = write_fixture(dir.path(), "Linked.json", LINKED_APP);
    let cache = write_fixture(dir.path(), "cache.json", PUBLIC_CACHE);

    cargo_bin_cmd!("objcdump")
        .arg("dump")
        .arg(&app)
        .arg("--cache")
        .arg(&cache)
        .arg("--deps")
        .arg("--class")
        .arg(".*")
        .assert()
        .success()
        .stdout(predicate::str::contains("@interface Main : NSObject"))
        .stdout(predicate::str::contains("@interface ToolkitButton : NSObject"));
}

#[test]
fn dump_command_lists_references() {
    let dir = tempdir().expect("tempdir");
    let app = write_fixture(dir.path(), "Linked.json", LINKED_APP);

    cargo_bin_cmd!("objcdump")
        .arg("dump")
        .arg(&app)
        .arg("--class")
        .arg("^$")
        .arg("--refs")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "@selectors refs\n0x00100008008 => 0x00100004000: init\n",
        ))
        .stdout(predicate::str::contains("@class refs").not());
}

#[test]
fn dump_command_rejects_bad_pattern() {
    let dir = tempdir().expect("tempdir");
    let app = write_fixture(dir.path(), "Demo.json", APP);

    cargo_bin_cmd!("objcdump")
        .arg("dump")
        .arg(&app)
        .arg("--protocol")
        .arg("(")
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to compile regex"));
}

#[test]
fn a2f_single_address() {
    let dir = tempdir().expect("tempdir");
    let cache = write_fixture(dir.path(), "cache.json", CACHE);

    cargo_bin_cmd!("objcdump")
        .arg("a2f")
        .arg(&cache)
        .arg("0x180001010")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "0x180001010: _objc_msgSend + 16 (start: 0x180001000, end: 0x180001100)",
        ));
}

#[test]
fn a2f_batch_writes_json() {
    let dir = tempdir().expect("tempdir");
    let cache = write_fixture(dir.path(), "cache.json", CACHE);
    let input = write_fixture(dir.path(), "addrs.txt", "0x180002000\n\n0x180001000\n");
    let output = dir.path().join("out.json");

    cargo_bin_cmd!("objcdump")
        .arg("a2f")
        .arg(&cache)
        .arg("--input")
        .arg(&input)
        .arg("--output")
        .arg(&output)
        .assert()
        .success();

    let json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&output).expect("read json")).expect("json");
    let records = json.as_array().expect("array");
    assert_eq!(records.len(), 2);
    assert_eq!(records[0]["name"], "_objc_retain");
    assert_eq!(records[0]["image"], "libobjc.A.dylib");
    assert_eq!(records[1]["size"], 256);
}

#[test]
fn a2f_address_outside_cache_fails() {
    let dir = tempdir().expect("tempdir");
    let cache = write_fixture(dir.path(), "cache.json", CACHE);

    cargo_bin_cmd!("objcdump")
        .arg("a2f")
        .arg(&cache)
        .arg("0x10")
        .assert()
        .failure()
        .stderr(predicate::str::contains("not in any image"));
}
