use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// "0.3.2" for releases, "0.3.2@abc1234 2024-01-15" for dev builds.
fn get_version() -> &'static str {
    const VERSION: &str = env!("CARGO_PKG_VERSION");
    const GIT_HASH: &str = env!("GIT_HASH");
    const GIT_COMMIT_DATE: &str = env!("GIT_COMMIT_DATE");
    const IS_RELEASE: &str = env!("IS_RELEASE");

    use std::sync::OnceLock;
    static VERSION_STRING: OnceLock<String> = OnceLock::new();

    VERSION_STRING.get_or_init(|| {
        if IS_RELEASE == "true" || GIT_HASH.is_empty() {
            VERSION.to_string()
        } else {
            format!("{}@{} {}", VERSION, GIT_HASH, GIT_COMMIT_DATE)
        }
    })
}

#[derive(Parser, Debug)]
#[command(name = "courseforge", version = get_version())]
#[command(about = "Generate course outlines, lessons, archives and ebooks", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Directory where downloaded files are written
    #[arg(short, long, global = true, default_value = ".")]
    pub output: PathBuf,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// One line typed into `courseforge shell`.
#[derive(Parser, Debug)]
#[command(name = "courseforge", no_binary_name = true, disable_version_flag = true)]
pub struct ShellLine {
    #[command(subcommand)]
    pub command: Commands,

    /// Directory where downloaded files are written (defaults to the session's)
    #[arg(short, long, global = true)]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug, Clone, Copy)]
pub struct RetryArgs {
    /// Re-run the job this many times after a quota error
    #[arg(long, default_value_t = 0)]
    pub retries: u32,

    /// Seconds to wait before each re-run
    #[arg(long, default_value_t = 60)]
    pub retry_delay: u64,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate a new syllabus for a course theme
    #[command(alias = "n")]
    New {
        /// Course theme, e.g. "Rust for embedded developers"
        theme: String,

        /// Extra guidance for the outline (audience, focus, length)
        #[arg(short, long)]
        context: Option<String>,
    },

    /// List saved syllabi, newest first
    #[command(alias = "ls")]
    List,

    /// Show a syllabus' modules and lessons
    #[command(alias = "v")]
    Show {
        /// History position (1 = newest) or id prefix
        syllabus: String,
    },

    /// Print a syllabus' outline text
    Outline {
        /// History position (1 = newest) or id prefix
        syllabus: String,

        /// Also write it as syllabus-<theme>.md
        #[arg(long)]
        save: bool,
    },

    /// Replace a syllabus' outline text (clears its generated lessons)
    #[command(alias = "e")]
    Edit {
        /// History position (1 = newest) or id prefix
        syllabus: String,

        /// File with the new outline, or - for stdin
        file: PathBuf,
    },

    /// Delete a syllabus
    #[command(alias = "rm")]
    Delete {
        /// History position (1 = newest) or id prefix
        syllabus: String,
    },

    /// Generate (or fetch from cache) one lesson and write it as HTML
    Lesson {
        /// History position (1 = newest) or id prefix
        syllabus: String,

        /// Lesson id as shown by `show`
        lesson: u32,

        /// Regenerate even if the lesson is cached
        #[arg(short, long)]
        force: bool,
    },

    /// Print preview markup for a generated lesson
    Preview {
        /// History position (1 = newest) or id prefix
        syllabus: String,

        /// Lesson id as shown by `show`
        lesson: u32,
    },

    /// Drop a lesson's generated content
    Forget {
        /// History position (1 = newest) or id prefix
        syllabus: String,

        /// Lesson id as shown by `show`
        lesson: u32,
    },

    /// Generate every lesson and pack them into a .tar.gz archive
    Archive {
        /// History position (1 = newest) or id prefix
        syllabus: String,

        #[command(flatten)]
        retry: RetryArgs,
    },

    /// Generate every lesson plus a cover and render a single ebook document
    Ebook {
        /// History position (1 = newest) or id prefix
        syllabus: String,

        /// Author printed on the cover (defaults to the `author` config key)
        #[arg(short, long)]
        author: Option<String>,

        #[command(flatten)]
        retry: RetryArgs,
    },

    /// Generate Mermaid diagram source for a concept
    Diagram {
        /// The concept to illustrate
        concept: String,

        /// Also write it as diagram-<concept>.mmd
        #[arg(long)]
        save: bool,
    },

    /// Write the whole history, generated lessons included, to a JSON file
    Backup,

    /// Replace the history with the contents of a backup file
    Restore {
        /// Path to a backup-courses-*.json file
        file: PathBuf,
    },

    /// Start an interactive session; generated lessons stay in memory until it ends
    #[command(alias = "sh")]
    Shell,

    /// Get or set configuration
    Config {
        /// Configuration key (e.g. author, text_model)
        key: Option<String>,

        /// Value to set (if omitted, prints current value)
        value: Option<String>,
    },
}
