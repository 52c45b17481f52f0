use clap::{Args, Parser, Subcommand, ValueEnum};
use rust_tree_reconciliation::io::{ReadOptions, SpeciesSource, read_newick_file, write_table_tsv};
use rust_tree_reconciliation::sdi::Sdi;
use rust_tree_reconciliation::sdir::{Criterion, Sdir, SdirOptions};
use rust_tree_reconciliation::support::count_support;
use rust_tree_reconciliation::Tree;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Infer gene duplications by reconciling gene trees with a species tree,
/// and count clade support from sample trees.
#[derive(Parser, Debug)]
#[command(name = "tree-reconcile", version, about = "Gene/species tree reconciliation and clade support")]
struct Cli {
    /// Quiet mode: only warnings and errors are logged
    #[arg(short = 'q', long = "quiet", default_value_t = false, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Reconcile rooted, binary gene trees
    Sdi(ReconcileArgs),
    /// Reconcile gene trees over all their rootings
    Sdir {
        #[command(flatten)]
        input: ReconcileArgs,

        /// What makes a rooting optimal
        #[arg(long = "criterion", value_enum, default_value_t = CriterionArg::Duplications)]
        criterion: CriterionArg,

        /// Break ties by tree height, then by root height difference
        #[arg(long = "minimize-height", default_value_t = false)]
        minimize_height: bool,

        /// Evaluate at most this many rootings per gene tree
        #[arg(long = "max-rootings")]
        max_rootings: Option<usize>,

        /// Report up to this many optimal root branches per gene tree
        #[arg(long = "max-trees", default_value_t = 1)]
        max_trees: usize,
    },
    /// Count how many sample trees contain each clade of a reference tree
    Support {
        /// Newick file whose first tree is the reference
        #[arg(short = 'r', long = "reference")]
        reference: PathBuf,

        /// Newick file with the sample (e.g. bootstrap) trees
        #[arg(short = 'b', long = "samples")]
        samples: PathBuf,

        /// Output path for the TSV table (gzip if it ends in .gz); logged if absent
        #[arg(short = 'o', long = "output")]
        output: Option<PathBuf>,
    },
}

#[derive(Args, Debug)]
struct ReconcileArgs {
    /// Newick file with the rooted, binary species tree
    #[arg(short = 's', long = "species")]
    species: PathBuf,

    /// Newick file with one or more gene trees
    #[arg(short = 'g', long = "gene")]
    gene: PathBuf,

    /// How gene leaf names carry their species
    #[arg(long = "species-from", value_enum, default_value_t = SpeciesFromArg::Suffix)]
    species_from: SpeciesFromArg,

    /// Separator in front of the species id in gene leaf names
    #[arg(long = "separator", default_value_t = '_')]
    separator: char,

    /// Remove gene leaves whose species is not in the species tree
    #[arg(long = "strip", default_value_t = false)]
    strip: bool,

    /// Output path for the TSV table (gzip if it ends in .gz); logged if absent
    #[arg(short = 'o', long = "output")]
    output: Option<PathBuf>,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum SpeciesFromArg { Name, Suffix }

#[derive(Copy, Clone, Debug, ValueEnum)]
enum CriterionArg { Duplications, MappingCost }

fn main() {
    let cli = Cli::parse();
    let default_level = if cli.quiet { "warn" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .init();

    match cli.command {
        Command::Sdi(args) => run_sdi(&args),
        Command::Sdir { input, criterion, minimize_height, max_rootings, max_trees } => {
            let options = SdirOptions::default()
                .with_criterion(match criterion {
                    CriterionArg::Duplications => Criterion::Duplications,
                    CriterionArg::MappingCost => Criterion::MappingCost,
                })
                .with_minimize_height(minimize_height)
                .with_mapping_cost(true)
                .with_max_rootings(max_rootings)
                .with_max_trees_to_return(max_trees);
            run_sdir(&input, options)
        }
        Command::Support { reference, samples, output } => {
            run_support(&reference, &samples, output.as_deref())
        }
    }
}

fn run_sdi(args: &ReconcileArgs) {
    let (species_tree, gene_trees) = read_inputs(args);
    let sdi = Sdi::new(&species_tree).unwrap_or_else(|e| fail(3, format!("Invalid species tree: {e}")));

    let t0 = Instant::now();
    let mut rows = Vec::with_capacity(gene_trees.len());
    for (idx, mut gene_tree) in gene_trees.into_iter().enumerate() {
        let stripped = if args.strip { sdi.strip_unknown_species(&mut gene_tree) } else { Vec::new() };
        let reconciliation = sdi
            .reconcile(&mut gene_tree)
            .unwrap_or_else(|e| fail(3, format!("Gene tree {idx}: {e}")));
        let cost = sdi
            .mapping_cost(&gene_tree, &reconciliation)
            .unwrap_or_else(|e| fail(3, format!("Gene tree {idx}: {e}")));
        rows.push(vec![
            idx.to_string(),
            reconciliation.duplications.to_string(),
            reconciliation.speciations.to_string(),
            cost.to_string(),
            stripped.join(","),
        ]);
    }
    info!("Reconciled {} gene trees in {:.3}s", rows.len(), t0.elapsed().as_secs_f64());

    emit(
        args.output.as_deref(),
        &["tree", "duplications", "speciations", "mapping_cost", "stripped"],
        &rows,
    );
}

fn run_sdir(args: &ReconcileArgs, options: SdirOptions) {
    let (species_tree, gene_trees) = read_inputs(args);
    let sdi = Sdi::new(&species_tree).unwrap_or_else(|e| fail(3, format!("Invalid species tree: {e}")));
    let sdir = Sdir::new(options);

    let t0 = Instant::now();
    let mut rows = Vec::with_capacity(gene_trees.len());
    for (idx, mut gene_tree) in gene_trees.into_iter().enumerate() {
        if args.strip {
            sdi.strip_unknown_species(&mut gene_tree);
        }
        let result = sdir
            .infer(&gene_tree, &sdi)
            .unwrap_or_else(|e| fail(3, format!("Gene tree {idx}: {e}")));
        for (rank, rooting) in result.optimal.iter().enumerate() {
            info!(
                "Gene tree {idx}: optimal rooting {rank} above node {:?} with {} duplications",
                gene_tree[rooting.branch].name, rooting.duplications
            );
        }
        rows.push(vec![
            idx.to_string(),
            result.candidate_rootings.to_string(),
            result.rootings_evaluated.to_string(),
            result.partial.to_string(),
            optional(result.min_duplications),
            optional(result.min_mapping_cost),
            result.optimal_rootings.to_string(),
            result
                .optimal
                .iter()
                .map(|r| gene_tree[r.branch].name.clone())
                .collect::<Vec<_>>()
                .join(","),
        ]);
    }
    info!("Evaluated rootings of {} gene trees in {:.3}s", rows.len(), t0.elapsed().as_secs_f64());

    emit(
        args.output.as_deref(),
        &[
            "tree",
            "candidate_rootings",
            "rootings_evaluated",
            "partial",
            "min_duplications",
            "min_mapping_cost",
            "optimal_rootings",
            "optimal_root_branches",
        ],
        &rows,
    );
}

fn run_support(reference: &Path, samples: &Path, output: Option<&Path>) {
    let options = ReadOptions::default();
    let mut reference_tree = read(reference, &options).swap_remove(0);
    let sample_trees = read(samples, &options);
    info!("Read {} sample trees", sample_trees.len());

    let t0 = Instant::now();
    let counts = count_support(&mut reference_tree, &sample_trees)
        .unwrap_or_else(|e| fail(3, format!("Failed to count support: {e}")));
    info!("Counted support of {} clades in {:.3}s", counts.len(), t0.elapsed().as_secs_f64());

    let rows: Vec<Vec<String>> = counts
        .iter()
        .map(|&(node, count)| {
            let clade = reference_tree
                .external_descendants(node)
                .unwrap_or_default()
                .into_iter()
                .map(|leaf| reference_tree[leaf].name.clone())
                .collect::<Vec<_>>()
                .join(",");
            vec![clade, count.to_string(), sample_trees.len().to_string()]
        })
        .collect();
    emit(output, &["clade", "support", "samples"], &rows);
}

fn read_inputs(args: &ReconcileArgs) -> (Tree, Vec<Tree>) {
    let species_options = ReadOptions::default().with_species(SpeciesSource::LeafName);
    let mut species_trees = read(&args.species, &species_options);
    if species_trees.len() > 1 {
        warn!("Using the first of {} trees in {:?} as species tree", species_trees.len(), args.species);
    }
    let gene_options = ReadOptions::default().with_species(match args.species_from {
        SpeciesFromArg::Name => SpeciesSource::LeafName,
        SpeciesFromArg::Suffix => SpeciesSource::NameSuffix(args.separator),
    });
    let gene_trees = read(&args.gene, &gene_options);
    info!("Read {} gene trees", gene_trees.len());
    (species_trees.swap_remove(0), gene_trees)
}

fn read(path: &Path, options: &ReadOptions) -> Vec<Tree> {
    read_newick_file(path, options).unwrap_or_else(|e| fail(2, format!("Failed to read {path:?}: {e}")))
}

fn emit(output: Option<&Path>, header: &[&str], rows: &[Vec<String>]) {
    match output {
        Some(path) => {
            let t0 = Instant::now();
            if let Err(e) = write_table_tsv(path, header, rows) {
                fail(4, format!("Failed to write output {path:?}: {e}"));
            }
            info!("Writing to output {:.3}s", t0.elapsed().as_secs_f64());
        }
        None => {
            for row in rows {
                let fields: Vec<String> =
                    header.iter().zip(row).map(|(h, v)| format!("{h}={v}")).collect();
                info!("{}", fields.join(" "));
            }
        }
    }
}

fn optional(value: Option<usize>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn fail(code: i32, msg: String) -> ! {
    error!("{msg}");
    std::process::exit(code);
}
