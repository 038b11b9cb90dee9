use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use std::fs::File;
use std::path::PathBuf;
use tephra::bitbase::{
    Bitbase, BitbaseSet, ClusterCache, Codec, DEFAULT_CLUSTER_SIZE, Generator, Roster, Settings,
    write_rust_source,
};
use tephra::chess::{Board, Flip};

#[derive(Debug, Parser)]
#[clap(name = "tephra", version, author)]
#[clap(about = "Generates and probes endgame bitbases")]
struct Cli {
    /// Directory holding the .btb files.
    #[arg(long, default_value = "bitbases")]
    bitbase_dir: PathBuf,

    /// Cluster cache capacity in megabytes.
    #[arg(long)]
    cache_size_mb: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Builds bitbases, dependencies first; names may contain `*`.
    Generate {
        /// Rosters such as KPK, KQKR, or K*K.
        names: Vec<String>,

        /// Worker threads.
        #[arg(long)]
        threads: Option<usize>,

        /// Compression: raw, rle, lz, or huffman.
        #[arg(long, default_value = "lz")]
        codec: String,

        /// Decompressed cluster size in bytes.
        #[arg(long, default_value_t = DEFAULT_CLUSTER_SIZE)]
        cluster_size: u32,
    },

    /// Probes a position given as FEN; loads the bitbases it needs.
    Probe {
        /// Piece placement and side to move, e.g. "4k3/8/8/8/8/8/4P3/4K3 w".
        fen: Vec<String>,
    },

    /// Emits a stored bitbase as an embeddable Rust constant.
    Emit {
        /// The roster, e.g. KPK.
        name: String,

        /// Output file; stdout when omitted.
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

fn parse_codec(s: &str) -> Result<Codec> {
    Ok(match s {
        "raw" => Codec::Raw,
        "rle" => Codec::Rle,
        "lz" => Codec::Lz,
        "huffman" => Codec::Huffman,
        _ => bail!("unknown codec {s:?}"),
    })
}

fn expand(name: &str, into: &mut Vec<String>) {
    match name.find('*') {
        None => into.push(name.to_string()),
        Some(i) => {
            for piece in ["Q", "R", "B", "N", "P"] {
                let mut expanded = name.to_string();
                expanded.replace_range(i..=i, piece);
                expand(&expanded, into);
            }
        }
    }
}

fn main() -> Result<()> {
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let cli = Cli::parse();
    if let Some(mb) = cli.cache_size_mb {
        ClusterCache::shared().set_capacity_mb(mb);
    }

    let mut set = BitbaseSet::new(&cli.bitbase_dir);

    match cli.command {
        Command::Generate {
            names,
            threads,
            codec,
            cluster_size,
        } => {
            let settings = Settings {
                threads: threads.unwrap_or_else(|| Settings::default().threads),
                codec: parse_codec(&codec)?,
                cluster_size,
                ..Settings::default()
            };

            let mut generator = Generator::with_settings(&mut set, settings);
            let mut expanded = Vec::new();
            for name in &names {
                expand(name, &mut expanded);
            }

            for name in expanded {
                let roster: Roster = name
                    .parse()
                    .with_context(|| format!("invalid roster {name:?}"))?;

                generator
                    .compute_rec(&roster)
                    .with_context(|| format!("generating {roster}"))?;
            }
        }

        Command::Probe { fen } => {
            let board: Board = fen
                .join(" ")
                .parse()
                .context("invalid position")?;

            if board.occupied().len() > tephra::bitbase::MAX_PIECES {
                bail!("too many pieces for a bitbase probe");
            }

            let roster = Roster::from_board(&board);
            set.load_wildcard(&roster.to_string());
            set.load_wildcard(&roster.signature().flip().to_string());

            println!("{}", set.value(&board));
        }

        Command::Emit { name, output } => {
            let roster: Roster = name
                .parse()
                .with_context(|| format!("invalid roster {name:?}"))?;

            let path = set.path_for(&roster);
            let bitbase = Bitbase::read_resident(&path, roster.signature())
                .with_context(|| format!("loading {}", path.display()))?;

            let image = bitbase
                .to_image(roster.signature(), DEFAULT_CLUSTER_SIZE, Codec::Lz)
                .context("bitbase is not resident")?;

            match output {
                None => write_rust_source(&mut std::io::stdout().lock(), &name, &image)?,
                Some(path) => {
                    let mut file = File::create(&path)
                        .with_context(|| format!("creating {}", path.display()))?;
                    write_rust_source(&mut file, &name, &image)?;
                }
            }
        }
    }

    Ok(())
}
