/*
 * Copyright (c) 2017, Alan Chen
 * See LICENCE file for BSD-2 terms
 */

 //! parse and manage utility options

use clap::{ value_parser, Arg, ArgAction, ArgMatches, Command };

use std::fs;
use std::path::PathBuf;

use tracing::info;

use crate::allocate::Naming;
use crate::error::{ Error, Result };

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareMode {
    /// decoded pixels, byte equality for non-images
    Pixel,
    /// SHA-256 over the whole file
    Digest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Verbosity {
    Quiet,
    Verbose,
    Debug,
}

/// store options selections parsed by args_to_opts()
#[derive(Debug, Clone)]
pub struct Options {
    pub prefix: String,
    pub in_dir: PathBuf,
    pub out_dir: PathBuf,
    pub dry_run: bool,
    pub recursive: bool,
    pub original_name: bool,
    pub first_number: usize,
    pub compare: CompareMode,
    pub verbosity: Verbosity,
}

impl Options {
    pub fn naming(&self) -> Naming
    {
        Naming {
            prefix: self.prefix.clone(),
            original_name: self.original_name,
            first_number: self.first_number,
        }
    }
}


pub fn default() -> Options
{
    Options {
        prefix: String::new(),
        in_dir: PathBuf::new(),
        out_dir: PathBuf::new(),
        dry_run: false,
        recursive: false,
        original_name: false,
        first_number: 1,
        compare: CompareMode::Pixel,
        verbosity: Verbosity::Quiet,
    }
}

fn app() -> Command
{
    Command::new("picstamp")
        .version(env!("CARGO_PKG_VERSION"))
        .about("picstamp copies a pile of photos and videos into a directory, \n\
            named by prefix and capture date so they sort chronologically")
        .arg(Arg::new("dir")
            .value_name("SCAN_DIR")
            .help("directory to scan")
            .required(true)
            .value_parser(value_parser!(PathBuf))
            )
        .arg(Arg::new("outdir")
            .value_name("OUTPUT_DIR")
            .help("output directory, may equal SCAN_DIR (dry run if not supplied)")
            .value_parser(value_parser!(PathBuf))
            )
        .arg(Arg::new("prefix")
            .short('p')
            .long("prefix")
            .value_name("PREFIX")
            .help("Name prefix for every copied file")
            .required(true)
            )
        .arg(Arg::new("dry_run")
            .short('n')
            .long("dry-run")
            .help("Show what would be copied without writing anything")
            .action(ArgAction::SetTrue)
            )
        .arg(Arg::new("recursive")
            .short('r')
            .long("recursive")
            .help("Descend into subdirectories of SCAN_DIR")
            .action(ArgAction::SetTrue)
            )
        .arg(Arg::new("original_name")
            .short('o')
            .long("original-name")
            .help("Keep the original file name at the end of the new one")
            .action(ArgAction::SetTrue)
            )
        .arg(Arg::new("first_number")
            .long("first-number")
            .value_name("N")
            .help("Number given to the first file without a capture date")
            .default_value("1")
            .value_parser(value_parser!(usize))
            )
        .arg(Arg::new("full_hash")
            .short('f')
            .long("full-hash")
            .help("Treat only byte identical files as duplicates")
            .action(ArgAction::SetTrue)
            )
        .arg(Arg::new("verbose")
            .short('v')
            .long("verbose")
            .help("Progress and per-file information")
            .action(ArgAction::SetTrue)
            )
        .arg(Arg::new("debug")
            .long("debug")
            .help("Debug logging")
            .action(ArgAction::SetTrue)
            )
}

pub fn args_to_opts() -> Options
{
    matches_to_opts(&app().get_matches())
}

fn matches_to_opts(amats: &ArgMatches) -> Options
{
    let mut opts = default();

    if let Some(dir) = amats.get_one::<PathBuf>("dir") {
        opts.in_dir = dir.clone();
    }
    if let Some(prefix) = amats.get_one::<String>("prefix") {
        opts.prefix = prefix.clone();
    }
    opts.out_dir = match amats.get_one::<PathBuf>("outdir") {
        Some(od) => od.clone(),
        None => {
            opts.dry_run = true;
            opts.in_dir.clone()
        }
    };
    if amats.get_flag("dry_run") {
        opts.dry_run = true;
    }
    opts.recursive = amats.get_flag("recursive");
    opts.original_name = amats.get_flag("original_name");
    if let Some(n) = amats.get_one::<usize>("first_number") {
        opts.first_number = *n;
    }
    if amats.get_flag("full_hash") {
        opts.compare = CompareMode::Digest;
    }
    opts.verbosity = if amats.get_flag("debug") {
        Verbosity::Debug
    } else if amats.get_flag("verbose") {
        Verbosity::Verbose
    } else {
        Verbosity::Quiet
    };

    opts
}

/// Check the directories and prefix before anything runs. The destination is
/// created when missing, except on a dry run.
pub fn validate(opts: &mut Options) -> Result<()>
{
    if opts.prefix.contains('/') || opts.prefix.contains('\\') {
        return Err(Error::Config(format!("prefix may not contain a path separator: {}", opts.prefix)));
    }
    if !opts.in_dir.is_dir() {
        return Err(Error::Config(format!("directory does not exist: {}", opts.in_dir.display())));
    }
    opts.in_dir = fs::canonicalize(&opts.in_dir)?;

    if !opts.out_dir.exists() {
        if opts.dry_run {
            return Ok(());
        }
        fs::create_dir_all(&opts.out_dir)?;
        info!("created directory {}", opts.out_dir.display());
    }
    if !opts.out_dir.is_dir() {
        return Err(Error::Config(format!("not a directory: {}", opts.out_dir.display())));
    }
    opts.out_dir = fs::canonicalize(&opts.out_dir)?;
    Ok(())
}


#[cfg(test)]
mod test {
    use super::*;

    fn parse(args: &[&str]) -> Options
    {
        let mut argv = vec!["picstamp"];
        argv.extend_from_slice(args);
        matches_to_opts(&app().try_get_matches_from(argv).unwrap())
    }

    #[test]
    fn t_defaults() {
        let opts = parse(&["-p", "Croatia", "in", "out"]);
        assert_eq!(opts.prefix, "Croatia");
        assert_eq!(opts.in_dir, PathBuf::from("in"));
        assert_eq!(opts.out_dir, PathBuf::from("out"));
        assert!(!opts.dry_run);
        assert!(!opts.recursive);
        assert!(!opts.original_name);
        assert_eq!(opts.first_number, 1);
        assert_eq!(opts.compare, CompareMode::Pixel);
        assert_eq!(opts.verbosity, Verbosity::Quiet);
    }

    #[test]
    fn t_flags() {
        let opts = parse(&["--prefix", "X", "-r", "-o", "-f", "-v", "-n",
            "--first-number", "0", "in", "in"]);
        assert!(opts.dry_run);
        assert!(opts.recursive);
        assert!(opts.original_name);
        assert_eq!(opts.first_number, 0);
        assert_eq!(opts.compare, CompareMode::Digest);
        assert_eq!(opts.verbosity, Verbosity::Verbose);
        assert_eq!(opts.naming().prefix, "X");
    }

    #[test]
    fn t_no_outdir_is_dry_run() {
        let opts = parse(&["-p", "X", "--debug", "in"]);
        assert!(opts.dry_run);
        assert_eq!(opts.out_dir, PathBuf::from("in"));
        assert_eq!(opts.verbosity, Verbosity::Debug);
    }

    #[test]
    fn t_prefix_required() {
        assert!(app().try_get_matches_from(["picstamp", "in", "out"]).is_err());
    }

    #[test]
    fn t_validate() {
        let tmp = tempfile::tempdir().unwrap();
        let mut opts = default();
        opts.prefix = String::from("Croatia");
        opts.in_dir = tmp.path().to_path_buf();
        opts.out_dir = tmp.path().join("new/out");

        validate(&mut opts).unwrap();
        assert!(opts.out_dir.is_dir());
        assert!(opts.in_dir.is_absolute());

        let mut bad = opts.clone();
        bad.prefix = String::from("a/b");
        assert!(matches!(validate(&mut bad), Err(Error::Config(_))));

        let mut missing = opts.clone();
        missing.in_dir = tmp.path().join("nope");
        assert!(matches!(validate(&mut missing), Err(Error::Config(_))));

        let mut dry = opts.clone();
        dry.dry_run = true;
        dry.out_dir = tmp.path().join("never");
        validate(&mut dry).unwrap();
        assert!(!tmp.path().join("never").exists());
    }
}
