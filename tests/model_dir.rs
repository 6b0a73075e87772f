//! Tests driving the CLI handlers against an on-disk model directory.
use clinkplan::cli::{
    RunOpts, handle_analyse_command, handle_run_command, handle_validate_command,
};
use clinkplan::output::{RUN_FILE_NAME, read_run};
use clinkplan::settings::Settings;
use float_cmp::assert_approx_eq;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use tempfile::tempdir;

/// Write the two-plant model used across these tests to `dir`
fn write_model(dir: &Path) {
    let mut file = File::create(dir.join("plan.toml")).unwrap();
    writeln!(file, "periods = [\"2025-01\"]").unwrap();

    let mut file = File::create(dir.join("plants.csv")).unwrap();
    writeln!(
        file,
        "id,name,type,storage_capacity,safety_stock,initial_inventory,\
         production_capacity,production_cost,active"
    )
    .unwrap();
    writeln!(file, "CP1,North clinker,clinker,1000,0,0,100,10,true").unwrap();
    writeln!(file, "GU1,South grinding,grinding,1000,0,0,,,true").unwrap();

    let mut file = File::create(dir.join("routes.csv")).unwrap();
    writeln!(file, "origin,destination,mode,cost_per_trip,capacity_per_trip,sbq,enabled").unwrap();
    writeln!(file, "CP1,GU1,Road,20,50,10,true").unwrap();

    let mut file = File::create(dir.join("demand.csv")).unwrap();
    writeln!(file, "plant_id,period,demand_class,quantity").unwrap();
    writeln!(file, "GU1,2025-01,Fixed,80").unwrap();
}

fn run_opts(output_dir: &Path) -> RunOpts {
    RunOpts {
        output_dir: Some(output_dir.to_path_buf()),
        overwrite: true,
        solver: "highs".to_string(),
        time_limit: 60,
        mip_gap: 0.01,
        optimisation: "deterministic".to_string(),
        allow_shortfall: false,
    }
}

#[test]
fn validate_then_run_then_analyse() {
    let model_dir = tempdir().unwrap();
    write_model(model_dir.path());
    let output_dir = tempdir().unwrap();
    let output_path = output_dir.path().join("results");

    handle_validate_command(model_dir.path(), Some(Settings::default())).unwrap();
    handle_run_command(model_dir.path(), &run_opts(&output_path), Some(Settings::default()))
        .unwrap();

    let run_path = output_path.join(RUN_FILE_NAME);
    let solved = read_run(&run_path).unwrap();
    assert!(solved.is_success());
    assert_approx_eq!(f64, solved.objective_value, 840.0, epsilon = 1e-4);
    assert!(solved.analytics.is_none());
    assert!(output_path.join("metadata.toml").is_file());

    handle_analyse_command(&run_path, model_dir.path(), Some(Settings::default())).unwrap();
    let solved = read_run(&run_path).unwrap();
    let analytics = solved.analytics.expect("analytics should be attached");
    assert_approx_eq!(f64, analytics.kpis.total_demand, 80.0);
}

#[test]
fn unknown_solver_name_is_rejected_before_running() {
    let model_dir = tempdir().unwrap();
    write_model(model_dir.path());
    let output_dir = tempdir().unwrap();

    let mut opts = run_opts(&output_dir.path().join("results"));
    opts.solver = "glpk".to_string();
    let err = handle_run_command(model_dir.path(), &opts, Some(Settings::default())).unwrap_err();
    assert!(err.to_string().contains("Unknown solver backend"), "{err}");
}

#[test]
fn stochastic_run_uses_default_scenarios_when_unconfigured() {
    let model_dir = tempdir().unwrap();
    write_model(model_dir.path());
    let output_dir = tempdir().unwrap();
    let output_path = output_dir.path().join("results");

    let mut opts = run_opts(&output_path);
    opts.optimisation = "stochastic".to_string();
    handle_run_command(model_dir.path(), &opts, Some(Settings::default())).unwrap();

    let solved = read_run(&output_path.join(RUN_FILE_NAME)).unwrap();
    assert!(solved.is_success());
    let names: Vec<_> = solved
        .scenarios
        .iter()
        .map(|spec| spec.name.to_string())
        .collect();
    assert_eq!(names, ["Low", "Normal", "High"]);
}
