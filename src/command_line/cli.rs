#![allow(clippy::cast_precision_loss)]

use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use kropki_solver::csp::board::Board;
use kropki_solver::csp::solver::{Backtracker, SolveStats, Solver};
use kropki_solver::csp::variable_selection::{
    FirstUnassigned, MrvDegree, RandomOrder, VariableSelection,
};
use kropki_solver::kropki::puzzle::{parse_puzzle, parse_puzzle_file, write_solution, Puzzle};
use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tikv_jemalloc_ctl::{epoch, stats};

/// Defines the command-line interface for the Kropki solver application.
///
/// Uses `clap` for parsing arguments.
#[derive(Parser, Debug)]
#[command(name = "kropki-solver", version, about = "A Kropki Sudoku solver")]
pub(crate) struct Cli {
    /// An optional global path argument. If provided without a subcommand,
    /// it's treated as the path to a puzzle file to solve.
    #[arg(global = true)]
    pub path: Option<PathBuf>,

    /// Specifies the subcommand to execute (e.g. `solve`, `dir`, `text`).
    #[clap(subcommand)]
    pub command: Option<Commands>,

    /// Common options applicable to all commands.
    #[command(flatten)]
    pub common: CommonOptions,
}

/// Enumerates the available subcommands.
#[derive(Subcommand, Debug)]
pub(crate) enum Commands {
    /// Solve a puzzle file.
    Solve {
        /// Path to the puzzle file. The format is the one consumed by
        /// `kropki::puzzle::parse_puzzle_file`.
        #[arg(long)]
        path: PathBuf,

        /// Write the solved grid to this file in addition to stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Common options for this subcommand.
        #[command(flatten)]
        common: CommonOptions,
    },

    /// Solve every `.kropki` puzzle file under a directory.
    Dir {
        /// Path to the directory to walk.
        #[arg(long)]
        path: PathBuf,

        /// Common options for this subcommand.
        #[command(flatten)]
        common: CommonOptions,
    },

    /// Solve a puzzle provided as inline text.
    Text {
        /// The puzzle in its file format (board, horizontal markers,
        /// vertical markers, blank-line separated).
        #[arg(short, long)]
        input: String,

        /// Common options for this subcommand.
        #[command(flatten)]
        common: CommonOptions,
    },

    /// Generate shell completion scripts.
    Completions {
        /// The shell to generate completions for.
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

/// The variable selection strategy used by the search.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum SelectionType {
    /// Minimum remaining values with the degree heuristic tie-break.
    #[default]
    MrvDegree,
    /// First unassigned variable in row-major order.
    FirstUnassigned,
    /// Seeded random order (for heuristic comparisons).
    Random,
}

impl Display for SelectionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MrvDegree => write!(f, "mrv-degree"),
            Self::FirstUnassigned => write!(f, "first-unassigned"),
            Self::Random => write!(f, "random"),
        }
    }
}

/// Defines common command-line options shared across subcommands.
#[derive(Args, Debug, Default, Clone)]
pub(crate) struct CommonOptions {
    /// Enable debug output, providing more verbose logging during solving.
    #[arg(short, long, default_value_t = false)]
    pub(crate) debug: bool,

    /// Enable verification of a found solution against every constraint.
    #[arg(short, long, default_value_t = true)]
    pub(crate) verify: bool,

    /// Enable printing of performance and problem statistics.
    #[arg(short, long, default_value_t = true)]
    pub(crate) stats: bool,

    /// Enable printing of the solved grid.
    #[arg(short, long, default_value_t = false)]
    pub(crate) print_solution: bool,

    /// The variable selection strategy.
    #[arg(long, default_value_t = SelectionType::MrvDegree)]
    pub(crate) selection: SelectionType,
}

/// Dispatches the parsed command line.
pub(crate) fn run(cli: Cli) -> Result<(), String> {
    if let Some(path) = cli.path.clone() {
        if cli.command.is_none() {
            return solve_file(&path, None, &cli.common);
        }
    }

    match cli.command {
        Some(Commands::Solve {
            path,
            output,
            common,
        }) => solve_file(&path, output.as_deref(), &common),
        Some(Commands::Dir { path, common }) => solve_dir(&path, &common),
        Some(Commands::Text { input, common }) => {
            let time = Instant::now();
            let puzzle = parse_puzzle(&input).map_err(|e| e.to_string())?;
            let parse_time = time.elapsed();
            solve_and_report(&puzzle, &common, None, None, parse_time)
        }
        Some(Commands::Completions { shell }) => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_owned();
            clap_complete::generate(shell, &mut cmd, name, &mut std::io::stdout());
            Ok(())
        }
        None => Err("No command provided. Use --help for more information.".to_owned()),
    }
}

fn solve_file(path: &Path, output: Option<&Path>, common: &CommonOptions) -> Result<(), String> {
    let time = Instant::now();
    let puzzle = parse_puzzle_file(path).map_err(|e| e.to_string())?;
    let parse_time = time.elapsed();

    if common.debug {
        println!("Parsed puzzle:\n{puzzle}");
    }

    solve_and_report(&puzzle, common, Some(path), output, parse_time)
}

/// Solves every `.kropki` file under `path`, reporting each in turn.
fn solve_dir(path: &Path, common: &CommonOptions) -> Result<(), String> {
    if !path.is_dir() {
        return Err(format!("Provided path is not a directory: {}", path.display()));
    }

    for entry in walkdir::WalkDir::new(path)
        .into_iter()
        .filter_map(Result::ok)
    {
        let file_path = entry.path();
        if !file_path.is_file() {
            continue;
        }
        if file_path.extension().is_none_or(|ext| ext != "kropki") {
            continue;
        }
        solve_file(file_path, None, common)?;
    }

    Ok(())
}

fn solve_and_report(
    puzzle: &Puzzle,
    common: &CommonOptions,
    label: Option<&Path>,
    output: Option<&Path>,
    parse_time: Duration,
) -> Result<(), String> {
    if let Some(name) = label {
        println!("Solving: {}", name.display());
    }

    let (solution, elapsed, solve_stats) = solve(puzzle, common);

    // Advance the jemalloc epoch so the memory figures reflect the solve.
    epoch::advance().map_err(|e| e.to_string())?;
    let allocated_bytes = stats::allocated::mib()
        .and_then(|m| m.read())
        .map_err(|e| e.to_string())?;
    let resident_bytes = stats::resident::mib()
        .and_then(|m| m.read())
        .map_err(|e| e.to_string())?;
    let allocated_mib = allocated_bytes as f64 / (1024.0 * 1024.0);
    let resident_mib = resident_bytes as f64 / (1024.0 * 1024.0);

    if common.verify {
        verify_solution(puzzle, solution.as_ref());
    }

    if common.stats {
        print_stats(
            parse_time,
            elapsed,
            puzzle,
            &solve_stats,
            allocated_mib,
            resident_mib,
        );
    }

    match solution {
        Some(board) => {
            if common.print_solution || output.is_none() {
                println!("Solution:\n{board}");
            }
            if let Some(out) = output {
                write_solution(out, &board)
                    .map_err(|e| format!("Unable to write {}: {e}", out.display()))?;
                println!("Solution written to \"{}\"", out.display());
            }
            println!("\nSOLVED");
        }
        None => println!("\nNO SOLUTION"),
    }

    Ok(())
}

/// Runs the configured solver over the puzzle.
///
/// # Returns
/// A tuple containing:
/// * `Option<Board>`: The solved grid if one exists, otherwise `None`.
/// * `Duration`: The time taken by the search.
/// * `SolveStats`: Counters collected during the search.
fn solve(puzzle: &Puzzle, common: &CommonOptions) -> (Option<Board>, Duration, SolveStats) {
    match common.selection {
        SelectionType::MrvDegree => solve_with::<MrvDegree>(puzzle, common.debug),
        SelectionType::FirstUnassigned => solve_with::<FirstUnassigned>(puzzle, common.debug),
        SelectionType::Random => solve_with::<RandomOrder>(puzzle, common.debug),
    }
}

fn solve_with<S: VariableSelection + Default>(
    puzzle: &Puzzle,
    debug: bool,
) -> (Option<Board>, Duration, SolveStats) {
    let time = Instant::now();

    let mut solver: Backtracker<S> = Solver::new(puzzle.board.clone(), puzzle.markers.clone());
    let solution = solver.solve();

    let elapsed = time.elapsed();

    if debug {
        println!("Solution: {solution:?}");
        println!("Time: {elapsed:?}");
    }

    (solution, elapsed, solver.stats())
}

/// Verifies a found solution against every constraint of the puzzle.
///
/// Prints the verification verdict; a verification failure is a solver
/// bug, so it panics.
fn verify_solution(puzzle: &Puzzle, solution: Option<&Board>) {
    if let Some(board) = solution {
        let ok = puzzle.verify(board);
        println!("Verified: {ok:?}");
        assert!(ok, "Solution failed verification!");
    } else {
        println!("NO SOLUTION");
    }
}

/// Helper to print a single statistic line in a formatted table row.
fn stat_line(label: &str, value: impl Display) {
    println!("|  {label:<28} {value:>18}  |");
}

/// Helper to print a statistic line that includes a rate (value/second).
fn stat_line_with_rate(label: &str, value: usize, elapsed: f64) {
    let rate = if elapsed > 0.0 {
        value as f64 / elapsed
    } else {
        0.0
    };
    println!("|  {label:<20} {value:>12} ({rate:>9.0}/sec)  |");
}

/// Prints a summary of problem and search statistics.
fn print_stats(
    parse_time: Duration,
    elapsed: Duration,
    puzzle: &Puzzle,
    s: &SolveStats,
    allocated: f64,
    resident: f64,
) {
    let elapsed_secs = elapsed.as_secs_f64();
    let variables = puzzle.board.unassigned_cells().len();

    println!("\n=======================[ Problem Statistics ]========================");
    stat_line("Parse time (s)", format!("{:.3}", parse_time.as_secs_f64()));
    stat_line("Givens", 81 - variables);
    stat_line("Variables", variables);
    stat_line("Dot markers", puzzle.markers.dot_count());

    println!("========================[ Search Statistics ]========================");
    stat_line_with_rate("Decisions", s.decisions, elapsed_secs);
    stat_line_with_rate("Backtracks", s.backtracks, elapsed_secs);
    stat_line_with_rate("Pruned values", s.pruned, elapsed_secs);
    stat_line("Memory usage (MiB)", format!("{allocated:.2}"));
    stat_line("Resident memory (MiB)", format!("{resident:.2}"));
    stat_line("CPU time (s)", format!("{elapsed_secs:.3}"));
    println!("=====================================================================");
}
