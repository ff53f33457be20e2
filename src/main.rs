//! tinygit - a minimal content-addressable object store
//!
//! This is the main entry point for the tinygit command-line interface.

use std::error::Error;
use std::io::Write;
use std::process::ExitCode;

use tinygit::repo::Repository;
use tinygit::storage::ObjectId;

type CommandResult = Result<(), Box<dyn Error>>;

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();

    let Some(command) = args.get(1) else {
        print_help();
        return ExitCode::FAILURE;
    };

    let result = match command.as_str() {
        "init" => cmd_init(),
        "cat-file" => cmd_cat_file(&args[2..]),
        "hash-object" => cmd_hash_object(&args[2..]),
        "ls-tree" => cmd_ls_tree(&args[2..]),
        "write-tree" => cmd_write_tree(),
        "commit-tree" => cmd_commit_tree(&args[2..]),
        "clone" => cmd_clone(&args[2..]),
        "-h" | "--help" => {
            print_help();
            return ExitCode::SUCCESS;
        }
        "--version" => {
            println!("tinygit v0.1.0");
            return ExitCode::SUCCESS;
        }
        other => {
            eprintln!("Unknown command: {}", other);
            return ExitCode::FAILURE;
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn print_help() {
    println!("tinygit - a minimal content-addressable object store");
    println!();
    println!("Usage: tinygit <COMMAND> [ARGS]");
    println!();
    println!("Commands:");
    println!("  init                                Initialize a repository here");
    println!("  cat-file <hash>                     Print an object's raw payload");
    println!("  hash-object <path>                  Store a file as a blob, print its hash");
    println!("  ls-tree [-r] [--name-only] <hash>   List a tree's entries");
    println!("  write-tree                          Store the current directory as a tree");
    println!("  commit-tree <hash> -p <hash> -m <msg>  Create a commit object");
    println!("  clone <url> <dir>                   Clone a remote repository");
    println!();
    println!("Options:");
    println!("  -h, --help      Show this help message");
    println!("  --version       Show version");
}

fn cmd_init() -> CommandResult {
    let repo = Repository::init(".")?;
    println!(
        "Initialized empty repository in {}",
        repo.store().root().display()
    );
    Ok(())
}

fn cmd_cat_file(args: &[String]) -> CommandResult {
    let [hash] = args else {
        return Err("usage: tinygit cat-file <hash>".into());
    };
    let id = ObjectId::from_hex(hash)?;

    let repo = Repository::open(".")?;
    let payload = repo.cat_file(id)?;

    // raw bytes, no trailing newline added
    let mut stdout = std::io::stdout().lock();
    stdout.write_all(&payload)?;
    stdout.flush()?;
    Ok(())
}

fn cmd_hash_object(args: &[String]) -> CommandResult {
    let [path] = args else {
        return Err("usage: tinygit hash-object <path>".into());
    };

    let repo = Repository::open(".")?;
    let id = repo.hash_object(path)?;
    println!("{}", id);
    Ok(())
}

fn cmd_ls_tree(args: &[String]) -> CommandResult {
    let mut recursive = false;
    let mut names_only = false;
    let mut hash = None;

    for arg in args {
        match arg.as_str() {
            "-r" | "--recursive" => recursive = true,
            "--name-only" => names_only = true,
            other if !other.starts_with('-') => hash = Some(other),
            other => return Err(format!("unknown option: {}", other).into()),
        }
    }
    let Some(hash) = hash else {
        return Err("usage: tinygit ls-tree [-r|--recursive] [--name-only] <tree-hash>".into());
    };
    let id = ObjectId::from_hex(hash)?;

    let repo = Repository::open(".")?;
    for line in repo.ls_tree(id, recursive, names_only)? {
        println!("{}", line?);
    }
    Ok(())
}

fn cmd_write_tree() -> CommandResult {
    let repo = Repository::open(".")?;
    let id = repo.write_tree()?;
    println!("{}", id);
    Ok(())
}

fn cmd_commit_tree(args: &[String]) -> CommandResult {
    let usage = "usage: tinygit commit-tree <tree-hash> [-p <parent-hash>] -m <message>";

    let mut tree = None;
    let mut parent = None;
    let mut message = None;

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "-p" => {
                i += 1;
                parent = Some(args.get(i).ok_or(usage)?.clone());
            }
            "-m" => {
                i += 1;
                message = Some(args.get(i).ok_or(usage)?.clone());
            }
            other if !other.starts_with('-') && tree.is_none() => {
                tree = Some(other.to_string());
            }
            _ => return Err(usage.into()),
        }
        i += 1;
    }

    let (Some(tree), Some(message)) = (tree, message) else {
        return Err(usage.into());
    };
    let tree = ObjectId::from_hex(&tree)?;
    let parent = parent.as_deref().map(ObjectId::from_hex).transpose()?;

    let repo = Repository::open(".")?;
    let id = repo.commit_tree(tree, parent, &message)?;
    println!("{}", id);
    Ok(())
}

fn cmd_clone(args: &[String]) -> CommandResult {
    let [url, target] = args else {
        return Err("usage: tinygit clone <url> <target-dir>".into());
    };

    let (repo, stored) = Repository::clone(url, target)?;
    println!(
        "Cloned {} object(s) into {}",
        stored,
        repo.workdir().display()
    );
    Ok(())
}
