use std::io::{BufRead as _, Write as _};
use std::sync::Arc;

use anyhow::Context as _;

use crate::cli::{ImportArgs, LibraryArgs};
use crate::library::{CalibreDb, LibrarySource, RecordAssembler};
use crate::markdown::{Html2MdConverter, HtmlConverter};
use crate::merge::{ImportReport, MergeEngine, MergeOptions};
use crate::settings::{CleanupMode, JoplinConfig, Settings};
use crate::store::{JoplinClient, NoteStore};
use crate::taxonomy::{OutlineVisitor, walk_genres};
use crate::tree::Tree;

pub struct Importer {
    source: Arc<dyn LibrarySource>,
    store: Arc<dyn NoteStore>,
    converter: Arc<dyn HtmlConverter>,
    settings: Settings,
}

impl Importer {
    pub fn new(
        source: Arc<dyn LibrarySource>,
        store: Arc<dyn NoteStore>,
        settings: Settings,
    ) -> Self {
        let converter: Arc<dyn HtmlConverter> =
            Arc::new(Html2MdConverter::new(settings.insert_attributes));
        Self {
            source,
            store,
            converter,
            settings,
        }
    }

    #[must_use]
    pub fn with_converter(mut self, converter: Arc<dyn HtmlConverter>) -> Self {
        self.converter = converter;
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Imports the library below the notebook `selected` (store id; `None` = top level).
    pub async fn run(&self, selected: Option<&str>) -> crate::Result<ImportReport> {
        let assembler = RecordAssembler::prepare(
            Arc::clone(&self.source),
            Arc::clone(&self.converter),
            &self.settings,
        )
        .await?;
        let genres = assembler.genres().await?;
        tracing::info!(genres = genres.len(), "read genre column");

        let tree = Tree::load(self.store.as_ref()).await?;
        let mut engine = MergeEngine::new(
            tree,
            Arc::clone(&self.store),
            Arc::new(assembler),
            MergeOptions::from_settings(&self.settings),
        );
        engine.on_import_start(selected).await?;
        walk_genres(&genres, &mut engine).await?;
        engine.on_import_stop().await
    }
}

fn load_settings(args: &LibraryArgs) -> anyhow::Result<Settings> {
    let mut settings = match &args.settings {
        Some(path) => Settings::load(path)?,
        None => Settings::default(),
    };
    if let Some(field) = &args.genre_field {
        settings.genre_field = field.clone();
    }
    if let Some(pattern) = &args.shrink_genres {
        settings.shrink_genres = pattern.clone();
    }
    Ok(settings)
}

fn describe(err: crate::ImportError) -> anyhow::Error {
    let remedy = err.remedy();
    anyhow::Error::new(err).context(format!("import failed ({remedy})"))
}

fn confirm(prompt: &str) -> anyhow::Result<bool> {
    tokio::task::block_in_place(|| {
        let mut stderr = std::io::stderr();
        write!(stderr, "{prompt} [y/N] ").context("write prompt")?;
        stderr.flush().context("flush prompt")?;
        let mut answer = String::new();
        std::io::stdin()
            .lock()
            .read_line(&mut answer)
            .context("read confirmation")?;
        Ok(matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
    })
}

pub async fn run(args: ImportArgs) -> anyhow::Result<()> {
    let mut settings = load_settings(&args.source)?;
    if let Some(mode) = args.merge_mode {
        settings.merge_mode = mode;
    }
    if let Some(mode) = args.cleanup_mode {
        settings.cleanup_mode = mode;
    }
    if let Some(field) = &args.content_field {
        settings.content_field = field.clone();
    }
    if let Some(pattern) = &args.filter_titles {
        settings.filter_titles = pattern.clone();
    }
    tracing::debug!(?settings, "effective settings");

    let source = CalibreDb::open(&args.source.library).map_err(describe)?;
    let config = JoplinConfig::resolve(args.joplin_url.as_deref(), args.token.as_deref())?;
    let store = JoplinClient::new(&config)?;

    if settings.cleanup_mode == CleanupMode::Cleanup && !args.yes {
        let scope = args.notebook.as_deref().unwrap_or("the top level");
        let prompt = format!(
            "Cleanup removes notes and empty notebooks below {scope} that are not part of the library. Continue?"
        );
        if !confirm(&prompt)? {
            anyhow::bail!("import cancelled");
        }
    }

    let importer = Importer::new(Arc::new(source), Arc::new(store), settings);
    let report = importer
        .run(args.notebook.as_deref())
        .await
        .map_err(describe)?;
    println!(
        "{}",
        serde_json::to_string_pretty(&report).context("serialize import report")?
    );
    Ok(())
}

pub async fn genres(args: LibraryArgs) -> anyhow::Result<()> {
    let settings = load_settings(&args)?;
    let source = CalibreDb::open(&args.library).map_err(describe)?;
    let column = source
        .column_meta(&settings.genre_field)
        .await
        .map_err(describe)?;
    let genres = source
        .genre_entries(&column.table(), &settings.shrink_genres)
        .await
        .map_err(describe)?;

    let mut outline = OutlineVisitor::default();
    walk_genres(&genres, &mut outline).await.map_err(describe)?;
    print!("{}", outline.into_outline());
    Ok(())
}

pub async fn columns(args: LibraryArgs) -> anyhow::Result<()> {
    let source = CalibreDb::open(&args.library).map_err(describe)?;
    for column in source.custom_columns().await.map_err(describe)? {
        println!(
            "{}\t{}\t{}{}",
            column.label,
            column.name,
            column.datatype.as_str(),
            if column.is_multiple { "\tmultiple" } else { "" }
        );
    }
    Ok(())
}
