#![allow(dead_code)]

use std::path::Path;

use assert_cmd::Command;
use tempfile::TempDir;

pub fn retarget_cmd() -> Command {
	let mut cmd =
		Command::cargo_bin("retarget").unwrap_or_else(|e| panic!("retarget binary: {e}"));
	cmd.env("NO_COLOR", "1");
	cmd.env_remove("RUST_LOG");
	cmd
}

pub const PACKAGE_JSON: &str = r#"{
  "name": "vscode-ltex",
  "main": "./dist/extension.js",
  "engines": {
    "vscode": "^1.52.0"
  },
  "dependencies": {
    "vscode-languageclient": "7.0.0"
  },
  "devDependencies": {
    "coc.nvim": "0.0.80",
    "typescript": "4.1.3"
  },
  "retarget": {
    "currentTarget": "vscode",
    "targetChanges": {
      "coc.nvim": {
        "main": "./dist/coc.js",
        "engines": {
          "coc": "^0.0.80",
          "vscode": "-"
        },
        "moveToPrimary": [
          "coc.nvim"
        ]
      }
    }
  }
}
"#;

pub const EXTENSION_TS: &str = "// #if TARGET == 'vscode'\nimport * as Code from \"vscode\";\n// \
                                #elseif TARGET == 'coc.nvim'\n// import * as Code from \
                                \"coc.nvim\";\n// #endif\n";

pub const EXTENSION_TS_FOR_COC: &str = "// #if TARGET == 'vscode'\n// import * as Code from \
                                        \"vscode\";\n// #elseif TARGET == 'coc.nvim'\nimport * \
                                        as Code from \"coc.nvim\";\n// #endif\n";

/// A two-target extension project currently on `vscode`.
pub fn extension_project() -> TempDir {
	let tmp = tempfile::tempdir().unwrap_or_else(|e| panic!("tempdir: {e}"));
	write(tmp.path(), "package.json", PACKAGE_JSON);
	write(tmp.path(), "src/extension.ts", EXTENSION_TS);
	write(tmp.path(), "test/suite.ts", "run();\n");
	tmp
}

pub fn write(root: &Path, relative: &str, content: &str) {
	let path = root.join(relative);
	if let Some(parent) = path.parent() {
		std::fs::create_dir_all(parent).unwrap_or_else(|e| panic!("create_dir_all: {e}"));
	}
	std::fs::write(path, content).unwrap_or_else(|e| panic!("write: {e}"));
}

pub fn read(root: &Path, relative: &str) -> String {
	std::fs::read_to_string(root.join(relative)).unwrap_or_else(|e| panic!("read: {e}"))
}
