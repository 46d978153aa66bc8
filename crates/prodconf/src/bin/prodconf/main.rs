mod cli;

use prodconf::json_document::{JsonDocument, Loadable};
use prodconf::{Context, KeyPath, Options};
use serde_json::Value;

fn main() {
    use clap::Parser;
    let cli = cli::Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_env("PRODCONF_LOG"))
        .with_writer(std::io::stderr)
        .init();

    for new_path in cli.directory.iter() {
        match new_path.canonicalize() {
            Err(e) => {
                eprintln!(
                    "Failed to resolve path for -C/--directory {}\n{}",
                    new_path.display(),
                    e
                );
                std::process::exit(1);
            }
            Ok(cwd) => {
                if let Err(err) = std::env::set_current_dir(&cwd) {
                    eprintln!("Failed to set work directory to {}\n{}", cwd.display(), err,);
                    std::process::exit(1);
                }

                tracing::info!(directory=%cwd.display(), "Changed working directory");
            }
        }
    }

    let context = match Context::bootstrap(options(&cli.context)) {
        Ok(context) => context,
        Err(e) => {
            print_error(&anyhow::Error::new(e));
            std::process::exit(1);
        }
    };

    let command_result = match cli.command {
        cli::Command::Var(var_cli) => var(&context, var_cli),
        cli::Command::Dump(dump_cli) => dump(&context, dump_cli),
        cli::Command::Eval(eval_cli) => eval(&context, eval_cli),
    };

    if let Err(e) = &command_result {
        print_error(e);
    }
    std::process::exit(exit_status(&command_result, context.error_count()));
}

/// 1 on any error, counted ones included, 2 when nothing was found
fn exit_status(result: &anyhow::Result<bool>, error_count: usize) -> i32 {
    match result {
        Err(_) => 1,
        Ok(_) if error_count > 0 => 1,
        Ok(false) => 2,
        Ok(true) => 0,
    }
}

fn print_error(e: &anyhow::Error) {
    for error in e.chain() {
        eprintln!("{error}")
    }
}

fn options(args: &cli::ContextArgs) -> Options {
    let defaults = Options::default();
    Options {
        roots: match args.roots.is_empty() {
            true => defaults.roots,
            false => args.roots.clone(),
        },
        node: args.node.clone(),
        max_passes: args.max_passes.unwrap_or(defaults.max_passes),
        warn_on_uninitialized: !args.quiet_undef,
    }
}

/// Returns whether the key path was found
pub fn var(context: &Context, cli: cli::VarCommand) -> anyhow::Result<bool> {
    let key_path: KeyPath = cli.key_path.parse()?;
    let service = cli.service.as_deref();

    match context.lookup(cli.namespace.into(), &key_path, service)? {
        Some((scope, value)) => {
            tracing::debug!(%scope, "resolved");
            output(&cli.output, &value)?;
            Ok(true)
        }
        None => {
            eprintln!("{key_path} not found (namespace {})", cli.namespace);
            for (scope, matched) in context.diagnose(&key_path, service)? {
                if matched.is_empty() {
                    eprintln!("  {scope}: no key matched");
                } else {
                    eprintln!("  {scope}: matched up to {}", matched.join("."));
                }
            }
            Ok(false)
        }
    }
}

pub fn dump(context: &Context, cli: cli::DumpCommand) -> anyhow::Result<bool> {
    use cli::DumpScope::*;

    let print = |document: Option<&JsonDocument>| -> anyhow::Result<bool> {
        let Some(document) = document else {
            eprintln!("no {:?} document loaded", cli.scope);
            return Ok(false);
        };
        if let Some(path) = document.path() {
            tracing::info!(path=%path.display(), "dump");
        }
        let value = match cli.raw {
            true => document.raw(),
            false => document.evaluated(),
        };
        output(&cli.output, value)?;
        Ok(true)
    };

    match cli.scope {
        Site => print(context.site().document()),
        Node => {
            let node = context.node()?;
            print(node.as_deref().and_then(Loadable::document))
        }
        Service => {
            let name = cli
                .name
                .as_deref()
                .ok_or_else(|| anyhow::anyhow!("dump service needs a service name"))?;
            let service = context.service(name)?;
            print(service.document())
        }
    }
}

pub fn eval(context: &Context, cli: cli::EvalCommand) -> anyhow::Result<bool> {
    let value = context.eval(&cli.expression, cli.service.as_deref())?;
    output(&cli.output, &value)?;
    Ok(true)
}

fn output(output: &cli::OutputArgs, value: &Value) -> anyhow::Result<()> {
    match output.format {
        cli::OutputFormat::Yaml => serde_yaml::to_writer(std::io::stdout(), value)?,
        cli::OutputFormat::Json => {
            serde_json::to_writer_pretty(std::io::stdout(), value)?;
            println!();
        }
    };

    Ok(())
}
