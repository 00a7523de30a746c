mod common;

use common::*;
use retarget_core::AnyEmptyResult;
use serde_json::Value;

#[test]
fn check_passes_when_sources_match() -> AnyEmptyResult {
	let tmp = extension_project();

	retarget_cmd()
		.arg("check")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success()
		.stdout(predicates::str::contains(
			"Check passed: 2 file(s) match target `vscode`.",
		));

	Ok(())
}

#[test]
fn check_fails_for_stale_sources() -> AnyEmptyResult {
	let tmp = extension_project();
	write(tmp.path(), "src/extension.ts", EXTENSION_TS_FOR_COC);

	retarget_cmd()
		.args(["check", "--path"])
		.arg(tmp.path())
		.assert()
		.code(1)
		.stderr(predicates::str::contains("Check failed: 1 problem(s) for target `vscode`:"))
		.stderr(predicates::str::contains(
			"src/extension.ts:4: line belongs to inactive target `coc.nvim` but is not commented \
			 out",
		));

	Ok(())
}

#[test]
fn check_json_reports_unclosed_blocks() -> AnyEmptyResult {
	let tmp = extension_project();
	write(tmp.path(), "test/open.ts", "// #if TARGET == 'coc.nvim'\n// later();\n");

	let output = retarget_cmd()
		.args(["check", "--format", "json", "--path"])
		.arg(tmp.path())
		.output()?;
	assert_eq!(output.status.code(), Some(1));

	let result: Value = serde_json::from_slice(&output.stdout)?;
	assert_eq!(result["ok"], false);
	assert_eq!(result["current"], "vscode");
	assert_eq!(result["scanned"], 3);
	assert_eq!(result["diagnostics"][0]["file"], "test/open.ts");
	assert_eq!(result["diagnostics"][0]["line"], 1);
	assert_eq!(
		result["diagnostics"][0]["message"],
		"block for target `coc.nvim` is missing `#endif`"
	);

	Ok(())
}

#[test]
fn check_after_patch_passes() -> AnyEmptyResult {
	let tmp = extension_project();

	retarget_cmd()
		.args(["patch", "--target", "coc.nvim", "--path"])
		.arg(tmp.path())
		.assert()
		.success();

	retarget_cmd()
		.args(["check", "--path"])
		.arg(tmp.path())
		.assert()
		.success()
		.stdout(predicates::str::contains("match target `coc.nvim`"));

	Ok(())
}
