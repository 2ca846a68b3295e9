use blockstore::logger::Logger;
use blockstore::store::SqliteStore;
use blockstore::{BlockStore, FileInfo, Options};
use std::io::Write;
use std::str::FromStr;
use std::sync::Arc;

fn usage(prog: &str) -> ! {
    eprintln!("{} db_path init", prog);
    eprintln!("{} db_path containers", prog);
    eprintln!("{} db_path ls [container]", prog);
    eprintln!("{} db_path stat|cat|blocks container name", prog);
    std::process::exit(1);
}

fn print_info(f: &FileInfo) {
    let meta = serde_json::to_string(&f.meta).unwrap_or_default();
    println!(
        "{}/{} size {} max_size {} circular {} structured {} created {} modified {} meta {}",
        f.container,
        f.name,
        f.size,
        f.opts.max_size,
        f.opts.circular,
        f.opts.structured,
        f.created_ts,
        f.mod_ts,
        meta
    );
}

fn run(db_path: &str, cmd: &str, args: &[String]) -> blockstore::Result<()> {
    let opt = Options::new(db_path).validate()?;
    let db = Arc::new(SqliteStore::open(&opt)?);
    let bs = BlockStore::with_backend(db.clone());
    let file_arg = || match args {
        [c, n] => Ok((c.as_str(), n.as_str())),
        _ => Err(blockstore::Error::InvalidConfig(format!("{} needs container and name", cmd))),
    };

    match cmd {
        "init" => println!("initialized {}", db.describe()),
        "containers" => {
            for c in bs.all_container_ids()? {
                println!("{}", c);
            }
        }
        "ls" => {
            let files = match args.first() {
                Some(c) => bs.list_files(c)?,
                None => bs.list_all_files()?,
            };
            files.iter().for_each(print_info);
        }
        "stat" => {
            let (c, n) = file_arg()?;
            print_info(&bs.stat(c, n)?);
        }
        "cat" => {
            let (c, n) = file_arg()?;
            let (_, data) = bs.read_file(c, n)?;
            std::io::stdout().write_all(&data)?;
        }
        "blocks" => {
            let (c, n) = file_arg()?;
            for (idx, data) in db.blocks(c, n)? {
                println!("{:>6} {:>8}", idx, data.len());
            }
        }
        _ => return Err(blockstore::Error::InvalidConfig(format!("unknown command {}", cmd))),
    }
    Ok(())
}

fn main() {
    let level = std::env::var("BLOCKSTORE_LEVEL").unwrap_or("WARN".to_string());
    Logger::init().add_console();
    log::set_max_level(log::LevelFilter::from_str(&level).unwrap_or(log::LevelFilter::Warn));

    let args: Vec<String> = std::env::args().collect();
    let prog = args.first().map(|s| s.as_str()).unwrap_or("bstool");
    if args.len() < 3 {
        usage(prog);
    }

    if let Err(e) = run(&args[1], &args[2], &args[3..]) {
        eprintln!("{} fail, error {}", args[2], e);
        std::process::exit(1);
    }
}
