mod common;

use common::*;
use retarget_core::AnyEmptyResult;
use retarget_core::RetargetConfig;

#[test]
fn can_init() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;

	retarget_cmd()
		.arg("init")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success()
		.stdout(predicates::str::contains("Created config file"));

	let config_path = tmp.path().join("retarget.toml");
	assert!(config_path.exists());

	// The sample parses and matches the defaults.
	let config = RetargetConfig::parse(&std::fs::read_to_string(&config_path)?)?;
	assert_eq!(config.targets, vec!["coc.nvim", "vscode"]);
	assert_eq!(config.document.metadata_key, "retarget");

	Ok(())
}

#[test]
fn init_does_not_overwrite() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	write(tmp.path(), ".retarget.toml", "targets = [\"a\"]\n");

	retarget_cmd()
		.args(["init", "--path"])
		.arg(tmp.path())
		.assert()
		.success()
		.stdout(predicates::str::contains("already exists"));

	assert!(!tmp.path().join("retarget.toml").exists());
	assert_eq!(read(tmp.path(), ".retarget.toml"), "targets = [\"a\"]\n");

	Ok(())
}

#[test]
fn no_subcommand_prints_usage_hint() {
	retarget_cmd()
		.assert()
		.code(1)
		.stderr(predicates::str::contains("retarget --help"));
}
