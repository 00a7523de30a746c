mod common;

use common::*;
use retarget_core::AnyEmptyResult;
use serde_json::Value;

#[test]
fn patch_switches_and_restores_the_project() -> AnyEmptyResult {
	let tmp = extension_project();
	let root = tmp.path();

	retarget_cmd()
		.arg("patch")
		.arg("--target")
		.arg("coc.nvim")
		.arg("--path")
		.arg(root)
		.assert()
		.success()
		.stdout(predicates::str::contains(
			"Switched from `vscode` to `coc.nvim`: updated 2 file(s), scanned 2 source file(s).",
		));

	assert_eq!(read(root, "src/extension.ts"), EXTENSION_TS_FOR_COC);
	let package: Value = serde_json::from_str(&read(root, "package.json"))?;
	assert_eq!(package["main"], "./dist/coc.js");
	assert_eq!(package["retarget"]["currentTarget"], "coc.nvim");
	assert_eq!(package["dependencies"]["coc.nvim"], "0.0.80");

	retarget_cmd()
		.args(["patch", "-t", "vscode", "--path"])
		.arg(root)
		.assert()
		.success();

	assert_eq!(read(root, "package.json"), PACKAGE_JSON);
	assert_eq!(read(root, "src/extension.ts"), EXTENSION_TS);
	assert_eq!(read(root, "test/suite.ts"), "run();\n");

	Ok(())
}

#[test]
fn patch_to_the_active_target_is_a_noop() -> AnyEmptyResult {
	let tmp = extension_project();

	retarget_cmd()
		.args(["patch", "--target", "vscode", "--path"])
		.arg(tmp.path())
		.assert()
		.success()
		.stdout(predicates::str::contains("Already on target `vscode`."));

	assert_eq!(read(tmp.path(), "package.json"), PACKAGE_JSON);

	Ok(())
}

#[test]
fn dry_run_writes_nothing() -> AnyEmptyResult {
	let tmp = extension_project();

	retarget_cmd()
		.args(["patch", "--target", "coc.nvim", "--dry-run", "--path"])
		.arg(tmp.path())
		.assert()
		.success()
		.stdout(predicates::str::contains(
			"Dry run: would switch from `vscode` to `coc.nvim` and update 2 file(s):",
		))
		.stdout(predicates::str::contains("  package.json"))
		.stdout(predicates::str::contains("  src/extension.ts"));

	assert_eq!(read(tmp.path(), "package.json"), PACKAGE_JSON);
	assert_eq!(read(tmp.path(), "src/extension.ts"), EXTENSION_TS);

	Ok(())
}

#[test]
fn diff_shows_changed_lines() -> AnyEmptyResult {
	let tmp = extension_project();

	retarget_cmd()
		.args(["patch", "--target", "coc.nvim", "--dry-run", "--diff", "--path"])
		.arg(tmp.path())
		.assert()
		.success()
		.stderr(predicates::str::contains("-import * as Code from \"vscode\";"))
		.stderr(predicates::str::contains("+// import * as Code from \"vscode\";"))
		.stderr(predicates::str::contains("+  \"main\": \"./dist/coc.js\","));

	Ok(())
}

#[test]
fn unknown_target_fails_before_any_write() -> AnyEmptyResult {
	let tmp = extension_project();

	retarget_cmd()
		.args(["patch", "--target", "neovim", "--path"])
		.arg(tmp.path())
		.assert()
		.code(2)
		.stderr(predicates::str::contains("unknown target `neovim`"));

	assert_eq!(read(tmp.path(), "package.json"), PACKAGE_JSON);

	Ok(())
}

#[test]
fn malformed_source_aborts_the_switch() -> AnyEmptyResult {
	let tmp = extension_project();
	write(
		tmp.path(),
		"src/broken.ts",
		"// #if TARGET == 'coc.nvim'\nnotCommented();\n// #endif\n",
	);

	retarget_cmd()
		.args(["patch", "--target", "coc.nvim", "--path"])
		.arg(tmp.path())
		.assert()
		.code(2)
		.stderr(predicates::str::contains("malformed line 2"));

	assert_eq!(read(tmp.path(), "package.json"), PACKAGE_JSON);
	assert_eq!(read(tmp.path(), "src/extension.ts"), EXTENSION_TS);

	Ok(())
}

#[test]
fn unsupported_files_are_rejected_unless_excluded() -> AnyEmptyResult {
	let tmp = extension_project();
	write(tmp.path(), "src/icon.png", "");

	retarget_cmd()
		.args(["patch", "--target", "coc.nvim", "--path"])
		.arg(tmp.path())
		.assert()
		.code(2)
		.stderr(predicates::str::contains("no comment syntax known"));

	write(tmp.path(), "retarget.toml", "[exclude]\npatterns = [\"*.png\"]\n");

	retarget_cmd()
		.args(["patch", "--target", "coc.nvim", "--path"])
		.arg(tmp.path())
		.assert()
		.success();

	Ok(())
}

#[test]
fn config_from_dot_config_directory_is_used() -> AnyEmptyResult {
	let tmp = extension_project();
	write(
		tmp.path(),
		".config/retarget.toml",
		"targets = [\"vscode\", \"coc.nvim\", \"neovim\"]\n[sources]\ndirs = [\"test\"]\n",
	);

	retarget_cmd()
		.args(["patch", "--target", "coc.nvim", "--path"])
		.arg(tmp.path())
		.assert()
		.success()
		.stdout(predicates::str::contains("scanned 1 source file(s)"));

	// `src` is not scanned with this config.
	assert_eq!(read(tmp.path(), "src/extension.ts"), EXTENSION_TS);
	let package: Value = serde_json::from_str(&read(tmp.path(), "package.json"))?;
	assert!(package["retarget"]["targetChanges"]["neovim"].is_object());

	Ok(())
}

#[test]
fn verbose_lists_files_and_logs_to_stderr() -> AnyEmptyResult {
	let tmp = extension_project();

	retarget_cmd()
		.args(["patch", "--target", "coc.nvim", "--verbose", "--path"])
		.arg(tmp.path())
		.assert()
		.success()
		.stdout(predicates::str::contains("  src/extension.ts"))
		.stderr(predicates::str::contains("switched config document"));

	Ok(())
}
