//! Orchestration of the restructuring stages over one input folder.
//!
//! Stages run strictly in order, one document and one module at a time. Each stage writes its
//! artifacts under the output root (see [`Workspace`]) through [`run_stage`], so a rerun only
//! recomputes what is missing, failed, or built from inputs that have since changed.
//!
//! Unreadable input documents and module files are logged and skipped. A failing generation
//! request stops the run; everything written before it stays on disk.

use crate::artifact;
use crate::config::Config;
use crate::dedup;
use crate::enrich::{enrich, EnrichedOutline};
use crate::error::{Error, Result};
use crate::generator::{Generator, TaskKind};
use crate::outline::{parse_outline, render_source_headings, restructure_prompt, Outline};
use crate::progress::{ProgressReporter, StepTiming};
use crate::recompose::{self, Recomposer};
use crate::section::TitleIndex;
use crate::segment::{self, ModuleCheck, Segmenter};
use crate::source_index::SourceIndex;
use crate::stage::{run_stage, InputDigest, StageOutcome};
use crate::summarize;
use crate::title_index::TitleIndexer;
use indexmap::IndexMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Instant;
use tracing::{debug, info, warn};

const RESTRUCTURED_TXT: &str = "restructured_outline.txt";
const RESTRUCTURED_JSON: &str = "restructured_outline.json";
const ENRICHED_JSON: &str = "main_enriched.json";
const MERGED_TXT: &str = "merged.txt";
const MERGED_ALL_TXT: &str = "merged_all.txt";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
/// One step of the pipeline, in execution order.
pub enum Stage {
    /// Split input documents into module text files.
    Split,
    /// Check every document produced one module per configured title.
    Check,
    /// Build the title index of every module file.
    Index,
    /// Summarise every title index.
    Summarize,
    /// Gather same-named modules across documents and disambiguate their headings.
    Prepare,
    /// Ask for a new outline per module.
    Restructure,
    /// Parse the proposed outlines.
    Parse,
    /// Resolve outline provenance against the source index.
    Enrich,
    /// Regenerate section text per module.
    Recompose,
    /// Join every module's text into the final document.
    Assemble,
}

impl Stage {
    /// Every stage, in execution order.
    pub const ALL: [Stage; 10] = [
        Self::Split,
        Self::Check,
        Self::Index,
        Self::Summarize,
        Self::Prepare,
        Self::Restructure,
        Self::Parse,
        Self::Enrich,
        Self::Recompose,
        Self::Assemble,
    ];

    #[must_use]
    /// Name used on the command line, in logs and in status records.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Split => "split",
            Self::Check => "check",
            Self::Index => "index",
            Self::Summarize => "summarize",
            Self::Prepare => "prepare",
            Self::Restructure => "restructure",
            Self::Parse => "parse",
            Self::Enrich => "enrich",
            Self::Recompose => "recompose",
            Self::Assemble => "assemble",
        }
    }

    #[must_use]
    /// Whether this stage sends requests to the generation service.
    pub fn uses_generator(self) -> bool {
        matches!(self, Self::Summarize | Self::Restructure | Self::Recompose)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stage {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|stage| stage.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                let names: Vec<&str> = Self::ALL.iter().map(|s| s.as_str()).collect();
                format!("unknown stage '{s}', expected one of: {}", names.join(", "))
            })
    }
}

#[derive(Clone, Debug)]
/// Artifact locations under one output root.
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    #[must_use]
    /// Workspace rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    /// Output root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    /// Parent of every document's module folder.
    pub fn modules_dir(&self) -> PathBuf {
        self.root.join("modules")
    }

    #[must_use]
    /// Module text files of one document.
    pub fn project_modules(&self, project: &str) -> PathBuf {
        self.modules_dir().join(project)
    }

    #[must_use]
    /// Title-index artifact of one module file.
    pub fn title_index(&self, project: &str, module: &str) -> PathBuf {
        self.root
            .join("titles")
            .join(project)
            .join(format!("{module}.json"))
    }

    #[must_use]
    /// Summarised title-index artifact of one module file.
    pub fn summary(&self, project: &str, module: &str) -> PathBuf {
        self.root
            .join("summaries")
            .join(project)
            .join(format!("{module}.json"))
    }

    #[must_use]
    /// Parent of every module's merging folder; also holds the assembled document.
    pub fn merging_dir(&self) -> PathBuf {
        self.root.join("merging")
    }

    #[must_use]
    /// Merging folder of one module name.
    pub fn module_merge_dir(&self, module: &str) -> PathBuf {
        self.merging_dir().join(module)
    }

    #[must_use]
    /// Deduplicated source files of one module name, one per document.
    pub fn sources_dir(&self, module: &str) -> PathBuf {
        self.module_merge_dir(module).join("sources")
    }

    #[must_use]
    /// Final assembled document text.
    pub fn merged_all(&self) -> PathBuf {
        self.merging_dir().join(MERGED_ALL_TXT)
    }
}

/// Runs the stages for one input folder against one output root.
pub struct Pipeline<'a, G: Generator + ?Sized> {
    input_dir: PathBuf,
    workspace: Workspace,
    config: &'a Config,
    generator: &'a G,
    segmenter: Segmenter,
}

impl<'a, G: Generator + ?Sized> Pipeline<'a, G> {
    /// Pipeline reading documents from `input_dir` and writing under `output_root`.
    ///
    /// # Errors
    ///
    /// Returns an error if a configured module title cannot be turned into a pattern.
    pub fn new(
        input_dir: impl Into<PathBuf>,
        output_root: impl Into<PathBuf>,
        config: &'a Config,
        generator: &'a G,
    ) -> Result<Self> {
        Ok(Self {
            input_dir: input_dir.into(),
            workspace: Workspace::new(output_root),
            config,
            generator,
            segmenter: Segmenter::new(&config.module_titles)?,
        })
    }

    #[must_use]
    /// Artifact layout this pipeline writes to.
    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    /// Run every stage in order and return the path of the assembled document.
    ///
    /// # Errors
    ///
    /// Returns the first stage error; the reporter sees it as a failure event first.
    pub fn run(&self, reporter: &dyn ProgressReporter) -> Result<PathBuf> {
        self.run_stages(&Stage::ALL, reporter)?;
        Ok(self.workspace.merged_all())
    }

    /// Run `stages` in the given order, reporting progress over them.
    ///
    /// # Errors
    ///
    /// Returns the first stage error.
    pub fn run_stages(&self, stages: &[Stage], reporter: &dyn ProgressReporter) -> Result<()> {
        #[allow(clippy::cast_precision_loss)]
        let percent = |done: usize| done as f64 / stages.len().max(1) as f64 * 100.0;
        let mut history = Vec::with_capacity(stages.len());
        for (done, &stage) in stages.iter().enumerate() {
            reporter.stage_started(stage.as_str(), percent(done), &history);
            let start = Instant::now();
            if let Err(e) = self.execute(stage) {
                reporter.stage_failed(stage.as_str(), &e.to_string());
                return Err(e);
            }
            history.push(StepTiming {
                name: stage.as_str().to_string(),
                elapsed: start.elapsed(),
            });
            reporter.stage_finished(stage.as_str(), percent(done + 1), &history);
        }
        Ok(())
    }

    /// Run one stage.
    ///
    /// # Errors
    ///
    /// Returns an error if the stage cannot complete.
    pub fn execute(&self, stage: Stage) -> Result<()> {
        match stage {
            Stage::Split => self.split_documents().map(drop),
            Stage::Check => self.check_modules().map(drop),
            Stage::Index => self.index_titles().map(drop),
            Stage::Summarize => self.summarize().map(drop),
            Stage::Prepare => self.prepare_merging().map(drop),
            Stage::Restructure => self.restructure_outlines().map(drop),
            Stage::Parse => self.parse_outlines().map(drop),
            Stage::Enrich => self.enrich_outlines().map(drop),
            Stage::Recompose => self.recompose().map(drop),
            Stage::Assemble => self.assemble().map(drop),
        }
    }

    /// Split every `.txt`/`.md` document of the input folder into module files and return the
    /// project names that were split or already up to date.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InputNotFound`] if the input folder is missing.
    pub fn split_documents(&self) -> Result<Vec<String>> {
        if !self.input_dir.is_dir() {
            return Err(Error::InputNotFound(self.input_dir.clone()));
        }
        let mut documents = artifact::files_with_extension(&self.input_dir, "txt")?;
        documents.extend(artifact::files_with_extension(&self.input_dir, "md")?);
        documents.sort_by_key(|p| p.file_name().map(std::ffi::OsStr::to_os_string));
        if documents.is_empty() {
            warn!(dir = %self.input_dir.display(), "no input documents");
        }

        let titles: Vec<&str> = self.segmenter.titles().iter().map(|t| t.text.as_str()).collect();
        let titles = titles.join("\n");
        let mut projects = Vec::new();
        for document in &documents {
            let project = artifact::sanitize_file_name(&artifact::stem(document));
            let out_dir = self.workspace.project_modules(&project);
            let result = InputDigest::new()
                .text("module_titles", &titles)
                .file(document)
                .and_then(|digest| {
                    run_stage(Stage::Split.as_str(), &out_dir, &digest.finish(), || {
                        let text = artifact::read_text(document)?;
                        let modules = self.segmenter.split(&text);
                        artifact::reset_dir(&out_dir)?;
                        segment::write_modules(&modules, &out_dir)?;
                        info!(document = %document.display(), modules = modules.len(), "split");
                        Ok(())
                    })
                });
            match result {
                Ok(_) => projects.push(project),
                Err(e) => warn!(document = %document.display(), error = %e, "skipping document"),
            }
        }
        Ok(projects)
    }

    /// Check each document's module folder against the configured titles.
    ///
    /// Incomplete folders are logged; the check never fails a run.
    ///
    /// # Errors
    ///
    /// Returns an error if the module folders cannot be listed.
    pub fn check_modules(&self) -> Result<Vec<(String, ModuleCheck)>> {
        let titles = self.segmenter.titles();
        if titles.is_empty() {
            debug!("no module titles configured, nothing to check");
            return Ok(Vec::new());
        }
        let mut checks = Vec::new();
        for project in self.projects()? {
            let check = segment::check_modules(&self.workspace.project_modules(&project), titles)?;
            checks.push((project, check));
        }
        Ok(checks)
    }

    /// Build the title index of every module file. Returns the number of indexes written.
    ///
    /// # Errors
    ///
    /// Returns an error if the module folders cannot be listed.
    pub fn index_titles(&self) -> Result<usize> {
        let indexer: TitleIndexer = TitleIndexer::default();
        let mut written = 0;
        for project in self.projects()? {
            for txt in self.module_files(&project)? {
                let artifact_path = self.workspace.title_index(&project, &artifact::stem(&txt));
                let result = InputDigest::new().file(&txt).and_then(|digest| {
                    run_stage(Stage::Index.as_str(), &artifact_path, &digest.finish(), || {
                        let index = indexer.index_file(&txt)?;
                        artifact::write_json(&artifact_path, &index)
                    })
                });
                match result {
                    Ok(StageOutcome::Completed) => written += 1,
                    Ok(StageOutcome::Skipped) => {}
                    Err(e) => warn!(path = %txt.display(), error = %e, "skipping module file"),
                }
            }
        }
        Ok(written)
    }

    /// Fill in section summaries for every title index. Returns the number written.
    ///
    /// Does nothing when summaries are disabled in the configuration. Unreadable or malformed
    /// title indexes are logged and skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if a generation request fails.
    pub fn summarize(&self) -> Result<usize> {
        if !self.config.summarize {
            info!("summaries disabled, using plain title indexes");
            return Ok(0);
        }
        let mut written = 0;
        for project in self.projects()? {
            for txt in self.module_files(&project)? {
                let module = artifact::stem(&txt);
                let title_index = self.workspace.title_index(&project, &module);
                if !title_index.is_file() {
                    warn!(path = %title_index.display(), "no title index, not summarised");
                    continue;
                }
                let loaded = artifact::read_json::<TitleIndex>(&title_index).and_then(|index| {
                    let digest = InputDigest::new()
                        .text("task", TaskKind::Summarization.as_str())
                        .file(&title_index)?
                        .file(&txt)?
                        .finish();
                    Ok((index, digest))
                });
                let (index, digest) = match loaded {
                    Ok(loaded) => loaded,
                    Err(e) => {
                        warn!(
                            path = %title_index.display(),
                            error = %e,
                            "skipping unreadable title index"
                        );
                        continue;
                    }
                };
                let artifact_path = self.workspace.summary(&project, &module);
                let outcome = run_stage(Stage::Summarize.as_str(), &artifact_path, &digest, || {
                    let index = summarize::summarize_title_index(index, self.generator)?;
                    artifact::write_json(&artifact_path, &index)
                })?;
                if outcome == StageOutcome::Completed {
                    written += 1;
                }
            }
        }
        Ok(written)
    }

    /// Gather the title index of every same-named module into one merging folder per module,
    /// then disambiguate colliding headings there. Returns the module names prepared.
    ///
    /// Summarised indexes are used where present, plain title indexes otherwise.
    ///
    /// # Errors
    ///
    /// Returns an error if the folders cannot be listed or an index cannot be copied.
    pub fn prepare_merging(&self) -> Result<Vec<String>> {
        let mut groups: IndexMap<String, Vec<(String, PathBuf)>> = IndexMap::new();
        for project in self.projects()? {
            for txt in self.module_files(&project)? {
                let module = artifact::stem(&txt);
                let summary = self.workspace.summary(&project, &module);
                let source = if self.config.summarize && summary.is_file() {
                    summary
                } else {
                    self.workspace.title_index(&project, &module)
                };
                if !source.is_file() {
                    warn!(project = %project, module = %module, "no title index to merge");
                    continue;
                }
                groups.entry(module).or_default().push((project.clone(), source));
            }
        }
        groups.sort_keys();

        let mut prepared = Vec::new();
        for (module, sources) in &groups {
            let sources_dir = self.workspace.sources_dir(module);
            let mut digest = InputDigest::new();
            for (project, path) in sources {
                digest = digest.text("project", project).file(path)?;
            }
            run_stage(Stage::Prepare.as_str(), &sources_dir, &digest.finish(), || {
                artifact::reset_dir(&sources_dir)?;
                for (project, path) in sources {
                    artifact::copy_file(path, &sources_dir.join(format!("{project}.json")))?;
                }
                let report = dedup::disambiguate_dir(&sources_dir)?;
                info!(
                    module = %module,
                    documents = sources.len(),
                    renamed = report.level1.len() + report.level2.len(),
                    "prepared merging folder"
                );
                Ok(())
            })?;
            prepared.push(module.clone());
        }
        Ok(prepared)
    }

    /// Request a new outline for every merging folder. Returns the number of requests made.
    ///
    /// # Errors
    ///
    /// Returns an error if a generation request fails.
    pub fn restructure_outlines(&self) -> Result<usize> {
        let mut requested = 0;
        for dir in self.merge_dirs()? {
            let files = dedup::load_source_files(&dir.join("sources"))?;
            let listing = render_source_headings(&files);
            if listing.trim().is_empty() {
                warn!(dir = %dir.display(), "no headings to restructure");
                continue;
            }
            let artifact_path = dir.join(RESTRUCTURED_TXT);
            let digest = InputDigest::new()
                .text("task", TaskKind::Structuring.as_str())
                .text("listing", &listing)
                .finish();
            let outcome = run_stage(Stage::Restructure.as_str(), &artifact_path, &digest, || {
                let reply = self
                    .generator
                    .generate(&restructure_prompt(&listing), TaskKind::Structuring)?;
                artifact::write_text(&artifact_path, &reply)
            })?;
            if outcome == StageOutcome::Completed {
                requested += 1;
            }
        }
        Ok(requested)
    }

    /// Parse every restructuring reply into an outline. Returns the number parsed.
    ///
    /// # Errors
    ///
    /// Returns an error if the folders cannot be listed or an outline cannot be written.
    pub fn parse_outlines(&self) -> Result<usize> {
        let mut parsed = 0;
        for dir in self.merge_dirs()? {
            let reply = dir.join(RESTRUCTURED_TXT);
            if !reply.is_file() {
                continue;
            }
            let artifact_path = dir.join(RESTRUCTURED_JSON);
            let digest = InputDigest::new().file(&reply)?.finish();
            let outcome = run_stage(Stage::Parse.as_str(), &artifact_path, &digest, || {
                let outline = parse_outline(&artifact::read_text(&reply)?);
                if outline.is_empty() {
                    warn!(path = %reply.display(), "no headings recognised in reply");
                }
                artifact::write_json(&artifact_path, &outline)
            })?;
            if outcome == StageOutcome::Completed {
                parsed += 1;
            }
        }
        Ok(parsed)
    }

    /// Resolve every outline's provenance against its folder's source files. Returns the
    /// number of outlines enriched.
    ///
    /// # Errors
    ///
    /// Returns an error if an outline or source folder cannot be read.
    pub fn enrich_outlines(&self) -> Result<usize> {
        let mut enriched = 0;
        for dir in self.merge_dirs()? {
            let outline_path = dir.join(RESTRUCTURED_JSON);
            if !outline_path.is_file() {
                continue;
            }
            let sources_dir = dir.join("sources");
            let source_paths = artifact::files_with_extension(&sources_dir, "json")?;
            let digest = InputDigest::new()
                .file(&outline_path)?
                .files(&source_paths)?
                .finish();
            let artifact_path = dir.join(ENRICHED_JSON);
            let outcome = run_stage(Stage::Enrich.as_str(), &artifact_path, &digest, || {
                let outline: Outline = artifact::read_json(&outline_path)?;
                let files = dedup::load_source_files(&sources_dir)?;
                let index = SourceIndex::build(&files);
                let result = enrich(&outline, &index);
                info!(
                    dir = %dir.display(),
                    indexed = index.len(),
                    unresolved = result.unresolved_count(),
                    "enriched outline"
                );
                artifact::write_json(&artifact_path, &result)
            })?;
            if outcome == StageOutcome::Completed {
                enriched += 1;
            }
        }
        Ok(enriched)
    }

    /// Regenerate the text of every enriched outline. Returns the number of modules written.
    ///
    /// # Errors
    ///
    /// Returns an error if a generation request fails.
    pub fn recompose(&self) -> Result<usize> {
        let recomposer = Recomposer::new(self.generator);
        let mut written = 0;
        for dir in self.merge_dirs()? {
            let enriched_path = dir.join(ENRICHED_JSON);
            if !enriched_path.is_file() {
                continue;
            }
            let artifact_path = dir.join(MERGED_TXT);
            let outline: EnrichedOutline = artifact::read_json(&enriched_path)?;
            let mut digest = InputDigest::new()
                .text("task", TaskKind::Merging.as_str())
                .file(&enriched_path)?;
            for path in outline.source_texts() {
                if path.is_file() {
                    digest = digest.file(path)?;
                }
            }
            let digest = digest.finish();
            let outcome = run_stage(Stage::Recompose.as_str(), &artifact_path, &digest, || {
                let sections = recomposer.recompose(&outline)?;
                artifact::write_text(&artifact_path, &recompose::render(&sections))
            })?;
            if outcome == StageOutcome::Completed {
                written += 1;
            }
        }
        Ok(written)
    }

    /// Join every module's merged text into the final document and return its path.
    ///
    /// # Errors
    ///
    /// Returns an error if a merged text cannot be read or the document cannot be written.
    pub fn assemble(&self) -> Result<PathBuf> {
        let merged: Vec<PathBuf> = self
            .merge_dirs()?
            .into_iter()
            .map(|dir| dir.join(MERGED_TXT))
            .filter(|p| p.is_file())
            .collect();
        let artifact_path = self.workspace.merged_all();
        let digest = InputDigest::new().files(&merged)?.finish();
        run_stage(Stage::Assemble.as_str(), &artifact_path, &digest, || {
            let parts = recompose::assemble(&self.workspace.merging_dir())?;
            info!(modules = parts.len(), path = %artifact_path.display(), "assembled document");
            artifact::write_text(&artifact_path, &recompose::render_assembly(&parts))
        })?;
        Ok(artifact_path)
    }

    /// Project names that have a module folder, sorted.
    fn projects(&self) -> Result<Vec<String>> {
        Ok(subdirectories_if_present(&self.workspace.modules_dir())?
            .iter()
            .filter_map(|dir| dir.file_name())
            .map(|name| name.to_string_lossy().into_owned())
            .collect())
    }

    fn module_files(&self, project: &str) -> Result<Vec<PathBuf>> {
        artifact::files_with_extension(&self.workspace.project_modules(project), "txt")
    }

    fn merge_dirs(&self) -> Result<Vec<PathBuf>> {
        subdirectories_if_present(&self.workspace.merging_dir())
    }
}

fn subdirectories_if_present(dir: &Path) -> Result<Vec<PathBuf>> {
    if dir.is_dir() {
        artifact::subdirectories(dir)
    } else {
        Ok(Vec::new())
    }
}

#[cfg(test)]
#[path = "tests/pipeline.rs"]
mod tests;
