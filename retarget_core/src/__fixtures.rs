use std::path::Path;

use serde_json::Value;
use serde_json::json;

use crate::ConfigDocument;
use crate::Overlay;
use crate::RetargetResult;
use crate::Target;
use crate::TargetSet;

pub const METADATA_KEY: &str = "retarget";
pub const PRIMARY: &str = "dependencies";
pub const SECONDARY: &str = "devDependencies";

/// A trimmed down extension manifest, active for `vscode`.
pub fn extension_manifest() -> Value {
	json!({
		"name": "vscode-ltex",
		"version": "13.0.0",
		"main": "./dist/extension.js",
		"activationEvents": ["onLanguage:markdown", "onLanguage:bibtex"],
		"engines": { "vscode": "^1.52.0" },
		"dependencies": { "vscode-languageclient": "7.0.0" },
		"devDependencies": { "coc.nvim": "0.0.80", "typescript": "4.1.3" },
		"retarget": {
			"currentTarget": "vscode",
			"targetChanges": {
				"coc.nvim": {
					"main": "./dist/coc.js",
					"activationEvents": { "onLanguage:bibtex": "-" },
					"engines": { "coc": "^0.0.80", "vscode": "-" },
					"moveToPrimary": ["coc.nvim"]
				}
			}
		}
	})
}

pub fn default_targets() -> TargetSet {
	TargetSet::default()
}

pub fn targets(names: &[&str]) -> TargetSet {
	TargetSet::new(names.iter().copied()).unwrap_or_else(|e| panic!("targets: {e}"))
}

pub fn document(value: Value) -> ConfigDocument {
	let Value::Object(root) = value else {
		panic!("fixture documents must be objects");
	};
	ConfigDocument::from_map(root, METADATA_KEY).unwrap_or_else(|e| panic!("document: {e}"))
}

pub fn render(document: &ConfigDocument) -> String {
	document.render().unwrap_or_else(|e| panic!("render: {e}"))
}

/// Pretty JSON with a trailing newline, as written by the engine.
pub fn to_json_text(value: &Value) -> String {
	let mut text = serde_json::to_string_pretty(value).unwrap_or_else(|e| panic!("json: {e}"));
	text.push('\n');
	text
}

pub fn switch(
	targets: &TargetSet,
	document: &mut ConfigDocument,
	target: &str,
) -> RetargetResult<Target> {
	Overlay::new(targets, PRIMARY, SECONDARY).switch_target(document, &Target::from(target))
}

pub fn write_file(root: &Path, relative: &str, content: &str) {
	let path = root.join(relative);
	if let Some(parent) = path.parent() {
		std::fs::create_dir_all(parent).unwrap_or_else(|e| panic!("create_dir_all: {e}"));
	}
	std::fs::write(path, content).unwrap_or_else(|e| panic!("write: {e}"));
}

pub fn read_file(root: &Path, relative: &str) -> String {
	std::fs::read_to_string(root.join(relative)).unwrap_or_else(|e| panic!("read: {e}"))
}

pub const TYPESCRIPT_SOURCE: &str = r#"import * as Path from "path";

// #if TARGET == 'vscode'
import * as Code from "vscode";
// #elseif TARGET == 'coc.nvim'
// import * as Code from "coc.nvim";
// #endif

export function activate(context: Code.ExtensionContext): void {
	// #if TARGET == 'vscode'
	Code.window.showInformationMessage("hello");
	// #elseif TARGET == 'coc.nvim'
	// Code.window.showMessage("hello");
	// #endif
	console.log(Path.sep);
}
"#;

pub const TYPESCRIPT_SOURCE_FOR_COC: &str = r#"import * as Path from "path";

// #if TARGET == 'vscode'
// import * as Code from "vscode";
// #elseif TARGET == 'coc.nvim'
import * as Code from "coc.nvim";
// #endif

export function activate(context: Code.ExtensionContext): void {
	// #if TARGET == 'vscode'
	// Code.window.showInformationMessage("hello");
	// #elseif TARGET == 'coc.nvim'
	Code.window.showMessage("hello");
	// #endif
	console.log(Path.sep);
}
"#;
