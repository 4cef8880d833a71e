use std::process::Command;

fn bin() -> Command {
    Command::new(env!("CARGO_BIN_EXE_spicier"))
}

#[test]
fn transient_subcommand_succeeds_on_resistor_divider() {
    let fixture = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/resistor_divider.json");
    let out_path = std::env::temp_dir().join("spicier_cli_test_resistor_divider.csv");

    let status = bin()
        .args([
            "transient",
            "--netlist",
            fixture,
            "--tend",
            "1e-6",
            "--dt",
            "1e-6",
            "--out",
            out_path.to_str().unwrap(),
        ])
        .status()
        .expect("failed to run spicier binary");

    assert!(status.success());
    let contents = std::fs::read_to_string(&out_path).unwrap();
    assert!(contents.starts_with("t,"));
    let _ = std::fs::remove_file(&out_path);
}

#[test]
fn missing_netlist_file_exits_with_netlist_error_code() {
    let status = bin()
        .args(["transient", "--netlist", "/nonexistent/path.json", "--tend", "1e-6", "--dt", "1e-6"])
        .status()
        .expect("failed to run spicier binary");

    assert_eq!(status.code(), Some(1));
}
