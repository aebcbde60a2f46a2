use clap::{Parser, Subcommand};
use std::error::Error;
use std::path::PathBuf;

use scenario_forge::compiler::emitter::{CLOSE_BROWSER_STEP, OPEN_APPLICATION_STEP};
use scenario_forge::compiler::{ActionSpec, Compiler, StepKeyword, StepMapper, StepRegistry, parse_scenarios};
use scenario_forge::config::{self, BootstrapSettings};
use scenario_forge::driver::{DriverSlot, RecordingLauncher};
use scenario_forge::input;
use scenario_forge::layout::Layout;
use scenario_forge::llm::{LlmClient, LlmConfig, draft_test_cases};
use scenario_forge::report::{FileOutcome, RunReport};
use scenario_forge::trigger::{CommandRunner, NoopRunner};

/// Scenario Forge - compile plain-language test scenarios into behave artifacts
#[derive(Parser, Debug)]
#[command(
    name = "scenario-forge",
    about = "Compile plain-language test scenarios into Gherkin features and Selenium step modules",
    after_help = "ENVIRONMENT VARIABLES:\n\
        SCENARIO_FORGE_INPUT_DIR       Directory holding test inputs\n\
        SCENARIO_FORGE_FEATURES_DIR    Directory for generated .feature files\n\
        SCENARIO_FORGE_STEPS_DIR       Directory for generated step modules\n\
        SCENARIO_FORGE_BOOTSTRAP_URL   Address opened by the bootstrap step\n\
        SCENARIO_FORGE_RUNNER          Test runner program\n\
        SCENARIO_FORGE_LLM_ENDPOINT    LLM API endpoint URL\n\
        SCENARIO_FORGE_LLM_MODEL       LLM model name\n\
        RUST_LOG                       Log filter (overrides -v)"
)]
struct Args {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Compile every input file into feature and step artifacts, then run them
    Generate {
        /// Directory holding test inputs [default: test_inputs]
        #[arg(long)]
        input_dir: Option<PathBuf>,

        /// Directory for generated .feature files [default: features]
        #[arg(long)]
        features_dir: Option<PathBuf>,

        /// Directory for generated step modules [default: features/steps]
        #[arg(long)]
        steps_dir: Option<PathBuf>,

        /// Address opened by the "I open the application" step [default: http://localhost:3000/crud-app]
        #[arg(long)]
        bootstrap_url: Option<String>,

        /// Open the first `open <host>` address found in the inputs instead of --bootstrap-url
        #[arg(long)]
        use_parsed_target: bool,

        /// Test runner invoked with each generated feature file [default: behave]
        #[arg(long)]
        runner: Option<String>,

        /// Generate artifacts without running them
        #[arg(long)]
        no_run: bool,

        /// Output the run report as JSON
        #[arg(long)]
        json: bool,
    },

    /// List step phrases already defined in the steps directory
    Scan {
        /// Directory holding step modules [default: features/steps]
        #[arg(long)]
        steps_dir: Option<PathBuf>,
    },

    /// Show the browser action a step phrase maps to
    Map {
        /// The step phrase, e.g. "click Login"
        phrase: String,
    },

    /// Dry-run the scenarios of one input file against a recording driver
    Plan {
        /// Input file to plan
        file: PathBuf,

        /// Address opened before each scenario [default: http://localhost:3000/crud-app]
        #[arg(long)]
        bootstrap_url: Option<String>,

        /// Output the driver calls as JSON
        #[arg(long)]
        json: bool,
    },

    /// Draft new test scenarios with a language model
    Draft {
        /// Actions to draft cases for (repeatable or comma-separated)
        #[arg(short, long = "action", required = true, value_delimiter = ',')]
        actions: Vec<String>,

        /// Inputs to combine with each action (repeatable or comma-separated)
        #[arg(short, long = "input", required = true, value_delimiter = ',')]
        inputs: Vec<String>,

        /// Write the drafted scenarios to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// LLM endpoint URL
        #[arg(long)]
        llm_endpoint: Option<String>,

        /// LLM model name
        #[arg(long)]
        llm_model: Option<String>,
    },
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    init_logging(args.verbose);

    match args.command {
        Commands::Generate {
            input_dir,
            features_dir,
            steps_dir,
            bootstrap_url,
            use_parsed_target,
            runner,
            no_run,
            json,
        } => {
            let cfg = config::get();
            let mut layout = Layout::from(&cfg.paths);
            if let Some(dir) = input_dir {
                layout.input_dir = dir;
            }
            if let Some(dir) = features_dir {
                layout.features_dir = dir;
            }
            if let Some(dir) = steps_dir {
                layout.steps_dir = dir;
            }
            let bootstrap = BootstrapSettings {
                url: bootstrap_url.unwrap_or_else(|| cfg.bootstrap.url.clone()),
                use_parsed_target: use_parsed_target || cfg.bootstrap.use_parsed_target,
            };
            let runner = runner.unwrap_or_else(|| cfg.runner.program.clone());

            let report = if no_run {
                Compiler::new(layout, bootstrap, NoopRunner).run()?
            } else {
                Compiler::new(layout, bootstrap, CommandRunner::new(runner)).run()?
            };

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_summary(&report);
            }
        }

        Commands::Scan { steps_dir } => {
            let steps_dir = steps_dir.unwrap_or_else(|| config::get().paths.steps_dir.clone());
            let registry = StepRegistry::scan(&steps_dir)?;
            println!("{} step phrases in {}", registry.len(), steps_dir.display());
            for phrase in registry.iter() {
                println!("  {}", phrase);
            }
        }

        Commands::Map { phrase } => {
            let mapping = StepMapper::default().map_step(phrase.trim());
            println!("{}", serde_json::to_string_pretty(&mapping.action)?);
            if let Some(mismatch) = mapping.mismatch {
                eprintln!("Warning: {}", mismatch);
            }
        }

        Commands::Plan {
            file,
            bootstrap_url,
            json,
        } => {
            let bootstrap_url = bootstrap_url.unwrap_or_else(|| config::get().bootstrap.url.clone());
            let lines = input::decode(&file)?;
            let parsed = parse_scenarios(&lines);
            if parsed.is_empty() {
                println!("No scenarios found in {}", file.display());
                return Ok(());
            }

            let mapper = StepMapper::default();
            let mut plans = serde_json::Map::new();

            for scenario in parsed.to_scenarios() {
                let mut slot = DriverSlot::new(RecordingLauncher);
                let open = ActionSpec::Navigate {
                    target: bootstrap_url.clone(),
                };
                let mut steps = vec![(StepKeyword::Given, OPEN_APPLICATION_STEP.to_string(), open)];
                for (i, step) in scenario.steps.iter().enumerate() {
                    steps.push((StepKeyword::for_position(i, scenario.steps.len()), step.clone(), mapper.map(step)));
                }

                if !json {
                    println!("Scenario: {}", scenario.name);
                }
                let mut entries = Vec::with_capacity(steps.len());
                for (keyword, phrase, action) in &steps {
                    let driver = slot.get()?;
                    let result = action.perform(driver);
                    let calls = driver.take_calls();
                    if !json {
                        println!("  {} {}", keyword.as_gherkin(), phrase);
                        for call in &calls {
                            println!("      {}", call);
                        }
                        if let Err(e) = &result {
                            println!("      failed: {}", e);
                        }
                    }
                    entries.push(serde_json::json!({
                        "keyword": keyword,
                        "step": phrase,
                        "action": action,
                        "calls": calls,
                        "error": result.err().map(|e| e.to_string()),
                    }));
                }
                slot.release()?;
                if !json {
                    println!("  Then {}", CLOSE_BROWSER_STEP);
                    println!("      release");
                    println!();
                }
                plans.insert(scenario.name, serde_json::Value::Array(entries));
            }

            if json {
                println!("{}", serde_json::to_string_pretty(&plans)?);
            }
        }

        Commands::Draft {
            actions,
            inputs,
            output,
            llm_endpoint,
            llm_model,
        } => {
            let mut llm_config = LlmConfig::default();
            if let Some(endpoint) = llm_endpoint {
                llm_config.endpoint = endpoint;
            }
            if let Some(model) = llm_model {
                llm_config.model = model;
            }
            let llm_endpoint = llm_config.endpoint.clone();
            let client = LlmClient::new(llm_config);
            match client.check_health(5) {
                Ok(true) => eprintln!("LLM endpoint responding, drafting {} cases...", actions.len() * inputs.len()),
                Ok(false) | Err(_) => {
                    eprintln!("Warning: LLM endpoint not responding at {}", llm_endpoint);
                    eprintln!("Drafted cases will only contain the summary line.");
                }
            }

            let cases = draft_test_cases(&client, &actions, &inputs);
            let text = cases
                .iter()
                .map(|c| c.to_scenario_text())
                .collect::<Vec<_>>()
                .join("\n");

            match output {
                Some(path) => {
                    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                        std::fs::create_dir_all(parent)?;
                    }
                    std::fs::write(&path, &text)?;
                    println!("Drafted {} test cases: {}", cases.len(), path.display());
                }
                None => print!("{}", text),
            }
        }
    }

    Ok(())
}

fn print_summary(report: &RunReport) {
    for file in &report.files {
        let label = match file.outcome {
            FileOutcome::Compiled => "compiled",
            FileOutcome::NoScenarios => "no scenarios",
            FileOutcome::Unsupported => "unsupported",
            FileOutcome::Failed => "failed",
        };
        println!("{}: {}", file.source.display(), label);
        if let Some(path) = &file.feature_path {
            println!("  feature: {}", path.display());
        }
        if let Some((path, status)) = &file.step_artifact {
            println!("  steps:   {} ({:?}, {} new)", path.display(), status, file.new_steps.len());
        }
        for warning in &file.warnings {
            println!("  warning: {}", warning);
        }
    }

    let elapsed = report.finished_at - report.started_at;
    println!(
        "\n{} compiled, {} without scenarios, {} unsupported, {} failed ({} ms)",
        report.count(FileOutcome::Compiled),
        report.count(FileOutcome::NoScenarios),
        report.count(FileOutcome::Unsupported),
        report.count(FileOutcome::Failed),
        elapsed.num_milliseconds()
    );
}
