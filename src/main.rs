use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::{arg, value_parser, ArgMatches, Command};
use ode_ivp::{
    EquationConvention, Integrator, Method, ProblemConfig, SolutionResponse, SolveOutput,
    SolverRequest,
};

fn main() -> Result<()> {
    let matches = command().get_matches();

    let level = match matches.get_count("verbose") {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    env_logger::builder().filter_level(level).init();

    let config = parse_config(&matches)?;
    log::info!(
        "solving order {} equation `{}` with {}",
        config.order,
        config.equation,
        config.method
    );

    let mut integrator = Integrator::new(config.clone()).context("invalid problem")?;
    if let Some(&max_steps) = matches.get_one::<u64>("max-steps") {
        integrator.set_step_budget(max_steps);
    }

    let solution = integrator.solve().with_context(|| {
        format!(
            "solve stopped after {} completed steps",
            integrator.trajectory().len()
        )
    })?;
    let output = SolveOutput {
        solution,
        trajectory: integrator.trajectory().clone(),
    };

    if matches.get_flag("json") {
        let response = SolutionResponse::from(&output);
        println!("{}", serde_json::to_string_pretty(&response)?);
    } else {
        print_summary(&config, &output);
    }

    Ok(())
}

fn command() -> Command {
    Command::new("ode-ivp")
        .about("Fixed-step solver for initial value problems written as text")
        .version(env!("CARGO_PKG_VERSION"))
        .arg(
            arg!(-r --request <FILE> "JSON solve request (camelCase fields)")
                .value_parser(value_parser!(PathBuf))
                .conflicts_with("equation"),
        )
        .arg(
            arg!(-e --equation <EQUATION> "Right-hand side, e.g. \"-y[0] + sin(x)\"")
                .allow_hyphen_values(true),
        )
        .arg(
            arg!(-o --order <N> "Order of the equation")
                .value_parser(value_parser!(usize))
                .default_value("1"),
        )
        .arg(
            arg!(-m --method <METHOD> "euler, midpoint, heun, rungeKutta or dormandPrince")
                .default_value("rungeKutta"),
        )
        .arg(
            arg!(--x0 <FLOAT> "Initial abscissa")
                .value_parser(value_parser!(f64))
                .allow_negative_numbers(true)
                .default_value("0"),
        )
        .arg(
            arg!(--y0 <VALUES> "Initial state, comma separated")
                .value_parser(value_parser!(f64))
                .value_delimiter(',')
                .allow_negative_numbers(true),
        )
        .arg(
            arg!(--reach <FLOAT> "Abscissa to integrate to")
                .value_parser(value_parser!(f64))
                .allow_negative_numbers(true),
        )
        .arg(
            arg!(-s --step <FLOAT> "Fixed step size")
                .value_parser(value_parser!(f64))
                .default_value("0.01"),
        )
        .arg(arg!(--legacy "Use x, y, z variable names and NaN on evaluation faults (overrides the request)"))
        .arg(
            arg!(--"max-steps" <N> "Abort after this many steps")
                .value_parser(value_parser!(u64)),
        )
        .arg(arg!(--json "Print the full response as JSON"))
        .arg(arg!(-v --verbose ... "Increase log verbosity"))
}

fn parse_config(matches: &ArgMatches) -> Result<ProblemConfig> {
    let mut config = match matches.get_one::<PathBuf>("request") {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            let request: SolverRequest = serde_json::from_str(&text)
                .with_context(|| format!("failed to parse request {}", path.display()))?;
            ProblemConfig::try_from(&request)?
        }
        None => parse_flags(matches)?,
    };
    if matches.get_flag("legacy") {
        config.convention = EquationConvention::Legacy;
    }
    Ok(config)
}

fn parse_flags(matches: &ArgMatches) -> Result<ProblemConfig> {
    let equation = matches
        .get_one::<String>("equation")
        .ok_or_else(|| anyhow!("either --request or --equation is required"))?;
    let initial_y: Vec<f64> = matches
        .get_many::<f64>("y0")
        .ok_or_else(|| anyhow!("--y0 is required"))?
        .copied()
        .collect();
    let reach_point = *matches
        .get_one::<f64>("reach")
        .ok_or_else(|| anyhow!("--reach is required"))?;

    let method: Method = matches
        .get_one::<String>("method")
        .map(|name| name.parse())
        .transpose()?
        .unwrap_or(Method::RungeKutta4);

    Ok(ProblemConfig {
        order: *matches.get_one::<usize>("order").unwrap_or(&1),
        equation: equation.clone(),
        method,
        initial_x: *matches.get_one::<f64>("x0").unwrap_or(&0.0),
        initial_y,
        reach_point,
        step_size: *matches.get_one::<f64>("step").unwrap_or(&0.01),
        convention: EquationConvention::Indexed,
    })
}

fn print_summary(config: &ProblemConfig, output: &SolveOutput) {
    println!("Equation:  y^({}) = {}", config.order, config.equation);
    println!("Method:    {} (h = {})", config.method, config.step_size);
    println!("Steps:     {}", output.trajectory.len());
    println!();
    println!("  x = {:.10}", output.solution.x);
    for (i, value) in output.solution.y.iter().enumerate() {
        println!("  y[{}] = {:.15e}", i, value);
    }
}
