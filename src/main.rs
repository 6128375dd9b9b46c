use std::io::Read;

use tracing::{error, info, span, Level};

use bucketfs::{fs, model, util};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt().json().init();

    let span = span!(Level::INFO, "main", context = "main");
    let _e = span.enter();
    info!("called");

    let matches = clap::Command::new("bucketfs")
        .arg(clap::Arg::new("ENDPOINT").required(true).index(1))
        .arg(clap::Arg::new("BUCKET").required(true).index(2))
        .arg(clap::Arg::new("COMMAND").required(true).index(3))
        .arg(clap::Arg::new("PATH").required(false).index(4))
        .arg(clap::Arg::new("prefix").long("prefix").default_value(""))
        .get_matches();

    let endpoint = matches.get_one::<String>("ENDPOINT").unwrap();
    let bucket = matches.get_one::<String>("BUCKET").unwrap();
    let command = matches.get_one::<String>("COMMAND").unwrap();
    let path = matches
        .get_one::<String>("PATH")
        .cloned()
        .unwrap_or_default();
    let prefix = matches.get_one::<String>("prefix").unwrap();
    info!(
        endpoint = endpoint,
        bucket = bucket,
        command = command,
        path = path,
        "args"
    );

    let endpoint_url = if endpoint.starts_with("http") {
        endpoint.clone()
    } else {
        format!("https://{}", endpoint)
    };

    let config = util::poll::poll_until_ready(aws_config::load_from_env());
    let s3_config = aws_sdk_s3::config::Builder::from(&config)
        .endpoint_url(endpoint_url)
        .force_path_style(true)
        .build();
    let client = aws_sdk_s3::Client::from_conf(s3_config);

    let fs = fs::ObjectFS::new(
        Box::new(client),
        endpoint,
        bucket,
        prefix,
        model::fs::AdapterOptions::default(),
    );

    if let Err(err) = run(&fs, command, &path) {
        error!(error_message = %err, error_group = command.as_str(), "command failed");
        std::process::exit(1);
    }
}

fn run(fs: &fs::ObjectFS, command: &str, path: &str) -> Result<(), model::fs::FSError> {
    match command {
        "ls" => {
            for entry in fs.list_contents(path, false)? {
                match entry {
                    model::fs::Entry::File { path, size, .. } => {
                        println!("{:>12}  {}", size, path);
                    }
                    model::fs::Entry::Dir { path } => {
                        println!("{:>12}  {}/", "-", path);
                    }
                }
            }

            Ok(())
        }
        "cat" => match fs.read_stream(path)? {
            None => Err(model::fs::FSError::NotFound {
                key: path.to_string(),
            }),
            Some(mut stream) => {
                let mut contents = Vec::new();
                stream.read_to_end(&mut contents)?;
                std::io::Write::write_all(&mut std::io::stdout(), &contents)?;

                Ok(())
            }
        },
        "stat" => match fs.metadata(path)? {
            None => Err(model::fs::FSError::NotFound {
                key: path.to_string(),
            }),
            Some(model::fs::Entry::Dir { path }) => {
                println!("dir   {}", path);

                Ok(())
            }
            Some(model::fs::Entry::File {
                path,
                size,
                mimetype,
                timestamp,
            }) => {
                let modified = time::OffsetDateTime::from_unix_timestamp(timestamp)
                    .unwrap_or(time::OffsetDateTime::UNIX_EPOCH);
                println!(
                    "file  {}  {} bytes  {}  {}",
                    path,
                    size,
                    mimetype.unwrap_or_else(|| "-".to_string()),
                    modified
                );

                Ok(())
            }
        },
        "url" => {
            println!("{}", fs.url(path)?);

            Ok(())
        }
        "sign" => {
            println!(
                "{}",
                fs.temporary_url(path, model::fs::Expiry::In(3600), "GET")?
            );

            Ok(())
        }
        _ => Err(model::fs::FSError::Config {
            message: format!("unknown command: {}", command),
        }),
    }
}
