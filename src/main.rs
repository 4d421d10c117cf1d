use clap::{Arg, ArgAction, ArgMatches, Command};
use std::error::Error;
use std::path::{Path, PathBuf};

use vaultsync::logging::init_tracing;
use vaultsync::{Config, SyncEntry, VaultSync};

/////////////
// Helpers //
/////////////

/// Defaults, then the config file, then VAULTSYNC_* variables, then flags
fn load_config(matches: &ArgMatches) -> Result<Config, Box<dyn Error>> {
	let mut config = match matches.get_one::<String>("config") {
		Some(file) => Config::load(Path::new(file))?,
		None => Config::default(),
	};
	config.apply_env();
	if let Some(server) = matches.get_one::<String>("server") {
		config.server_url = server.clone();
	}
	if let Some(user) = matches.get_one::<String>("user") {
		config.username = user.clone();
	}
	if let Some(password) = matches.get_one::<String>("password") {
		config.password = password.clone();
	}
	if matches.get_flag("insecure") {
		config.accept_self_signed_certificates = true;
	}
	Ok(config)
}

fn print_entries(entries: &[SyncEntry], json: bool) -> Result<(), Box<dyn Error>> {
	if json {
		println!("{}", serde_json::to_string_pretty(entries)?);
	} else {
		for entry in entries {
			println!("{:>2} {}", entry.verdict.code(), entry.path);
		}
	}
	Ok(())
}

fn path_arg(matches: &ArgMatches, name: &str) -> Result<PathBuf, Box<dyn Error>> {
	let path = matches.get_one::<String>(name).ok_or_else(|| format!("{} argument required", name))?;
	Ok(std::path::absolute(path)?)
}

fn cli() -> Command {
	Command::new("vaultsync")
		.version(env!("CARGO_PKG_VERSION"))
		.about("Sync a content checkout with a remote repository through content packages")
		.subcommand_required(true)
		.arg(
			Arg::new("config")
				.short('c')
				.long("config")
				.value_name("FILE")
				.global(true)
				.help("Config file (.toml, .json or .json5)"),
		)
		.arg(Arg::new("server").long("server").value_name("URL").global(true).help("Server URL"))
		.arg(Arg::new("user").short('u').long("user").value_name("USER").global(true).help("User name"))
		.arg(
			Arg::new("password")
				.short('p')
				.long("password")
				.value_name("PASSWORD")
				.global(true)
				.help("Password"),
		)
		.arg(
			Arg::new("insecure")
				.long("insecure")
				.action(ArgAction::SetTrue)
				.global(true)
				.help("Accept self-signed certificates"),
		)
		.arg(
			Arg::new("filter")
				.long("filter")
				.value_name("FILE")
				.global(true)
				.help("Filter file (default: <checkout>/META-INF/vault/filter.xml)"),
		)
		.arg(
			Arg::new("json")
				.long("json")
				.action(ArgAction::SetTrue)
				.global(true)
				.help("Print results as JSON"),
		)
		.subcommand(
			Command::new("push")
				.about("Send local content to the server")
				.arg(Arg::new("path").required(true)),
		)
		.subcommand(
			Command::new("pull")
				.about("Replace local content with the server's")
				.arg(Arg::new("path").required(true)),
		)
		.subcommand(
			Command::new("status")
				.about("Show what a push would include, without contacting the server")
				.arg(Arg::new("path").required(true)),
		)
		.subcommand(
			Command::new("open")
				.about("Print the server URL of a path")
				.arg(Arg::new("path").required(true)),
		)
		.subcommand(
			Command::new("install-deps")
				.about("Upload every file of a folder into the install folder")
				.arg(Arg::new("dir").required(true)),
		)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
	let matches = cli().get_matches();
	let config = load_config(&matches)?;
	init_tracing(&config.log_level);

	let json = matches.get_flag("json");
	let mut builder = VaultSync::builder().config(config);
	if let Some(filter) = matches.get_one::<String>("filter") {
		builder = builder.filter_file(std::path::absolute(filter)?);
	}
	let sync = builder.build()?;

	match matches.subcommand() {
		Some(("push", sub)) => print_entries(&sync.push(&path_arg(sub, "path")?).await?, json)?,
		Some(("pull", sub)) => print_entries(&sync.pull(&path_arg(sub, "path")?).await?, json)?,
		Some(("status", sub)) => print_entries(&sync.status(&path_arg(sub, "path")?).await?, json)?,
		Some(("open", sub)) => println!("{}", sync.remote_url(&path_arg(sub, "path")?)?),
		Some(("install-deps", sub)) => {
			let count = sync.install_dependencies(&path_arg(sub, "dir")?).await?;
			println!("{} file(s) installed", count);
		}
		_ => return Err("unknown command".into()),
	}

	Ok(())
}


// vim: ts=4
