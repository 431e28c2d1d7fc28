use crate::commands::common::ProjectArgs;
use crate::core::{
    COMPENDIA_DIR, CliError, LocaleNotFoundError, MergeReport, MergeSummary,
    MissingTemplatesReport, Project, TEMPLATES_DIR, TemplateNotFoundError, ToolFailedError,
};
use crate::gettext::{Invocation, SystemRunner, Tool, ToolRunner, Toolchain, run_checked};
use crate::utils::ui;
use clap::Parser;
use indicatif::ProgressBar;
use std::path::Path;
use std::time::Instant;
use tempfile::NamedTempFile;

/// Line width passed to `msginit` and `msgmerge`.
pub const MERGE_WIDTH: usize = 200;

/// Arguments for the merge command.
#[derive(Debug, Clone, Parser)]
pub struct MergeArgs {
    #[command(flatten)]
    pub project: ProjectArgs,

    /// Create locale directories for every configured language.
    #[arg(short, long)]
    pub create: bool,

    /// Keep a backup (`<catalog>.po~`) of each catalog that is updated.
    #[arg(short, long)]
    pub backup: bool,

    /// Only merge these locales (can be given multiple times).
    #[arg(short, long = "locale")]
    pub locales: Vec<String>,

    /// Print the gettext commands instead of running them.
    #[arg(long)]
    pub dry_run: bool,
}

/// Run the merge command.
pub fn run_merge(args: MergeArgs) -> Result<(), CliError> {
    let project = args.project.load()?;
    ui::print_merge_header();

    let start = Instant::now();
    let summary = merge_project(&project, &args, &SystemRunner)?;

    if args.dry_run {
        ui::print_dry_run_done();
    } else {
        ui::print_merged(summary.initialized, summary.merged, start.elapsed());
    }
    Ok(())
}

/// Merge the template of every standalone domain into each locale's catalog.
///
/// Missing programs and templates are reported before anything is written.
/// A failing program stops its domain; the remaining domains still run and
/// every failure is returned together in a [`MergeReport`].
pub fn merge_project(
    project: &Project,
    args: &MergeArgs,
    runner: &dyn ToolRunner,
) -> Result<MergeSummary, CliError> {
    let config = &project.config;
    let locale_dir = project.locale_dir();
    let domains = config.standalone_domains();

    let mut locales = list_locales(&locale_dir)?;
    if args.create {
        for language in &config.languages {
            let name = language.locale_dir_name();
            if !locales.contains(&name) {
                locales.push(name);
            }
        }
        locales.sort();
    }
    let locales = select_locales(locales, &args.locales)?;

    let toolchain = Toolchain::new(&config.tools);
    let mut required = vec![Tool::Init, Tool::Merge];
    if locales.iter().any(|locale| config.is_source_locale(locale)) {
        required.push(Tool::En);
    }
    toolchain.require(runner, &required)?;

    let missing: Vec<TemplateNotFoundError> = domains
        .iter()
        .filter_map(|domain| {
            let path = project.template_path(domain);
            (!path.is_file()).then(|| TemplateNotFoundError {
                domain: domain.clone(),
                path,
            })
        })
        .collect();
    if !missing.is_empty() {
        return Err(MissingTemplatesReport { missing }.into());
    }

    if args.create && !args.dry_run {
        for language in &config.languages {
            let dir = locale_dir.join(language.locale_dir_name()).join("LC_MESSAGES");
            if !dir.is_dir() {
                ui::print_creating_dir(&dir);
                fs_err::create_dir_all(&dir)?;
            }
        }
    }

    if locales.is_empty() {
        ui::print_no_locales(&locale_dir);
        return Ok(MergeSummary::default());
    }

    let mut merger = Merger {
        project,
        toolchain,
        runner,
        backup: args.backup,
        dry_run: args.dry_run,
        summary: MergeSummary::default(),
    };
    let mut failures = Vec::new();

    for domain in &domains {
        ui::print_merging(domain, locales.len());
        let pb = ui::create_progress_bar(locales.len() as u64, domain);

        for locale in &locales {
            match merger.merge_locale(&pb, domain, locale) {
                Ok(()) => pb.inc(1),
                Err(CliError::ToolFailed(err)) => {
                    pb.suspend(|| ui::print_domain_failed(domain, locale));
                    failures.push(err);
                    break;
                },
                Err(err) => {
                    pb.finish_and_clear();
                    return Err(err);
                },
            }
        }
        pb.finish_and_clear();
    }

    if !failures.is_empty() {
        return Err(MergeReport {
            domain_count: domains.len(),
            failures,
        }
        .into());
    }

    Ok(merger.summary)
}

/// Locale directories under `locale_dir`, sorted.
pub fn list_locales(locale_dir: &Path) -> Result<Vec<String>, CliError> {
    if !locale_dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut locales = Vec::new();
    for entry in fs_err::read_dir(locale_dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let Some(name) = entry.file_name().to_str().map(str::to_string) else {
            continue;
        };
        if name.starts_with('.') || name == TEMPLATES_DIR || name == COMPENDIA_DIR {
            continue;
        }
        locales.push(name);
    }
    locales.sort();
    Ok(locales)
}

fn select_locales(available: Vec<String>, requested: &[String]) -> Result<Vec<String>, CliError> {
    if requested.is_empty() {
        return Ok(available);
    }

    if let Some(unknown) = requested.iter().find(|l| !available.contains(l)) {
        return Err(LocaleNotFoundError {
            locale: unknown.clone(),
            available: available.join(", "),
        }
        .into());
    }

    Ok(available
        .into_iter()
        .filter(|locale| requested.contains(locale))
        .collect())
}

struct Merger<'a> {
    project: &'a Project,
    toolchain: Toolchain,
    runner: &'a dyn ToolRunner,
    backup: bool,
    dry_run: bool,
    summary: MergeSummary,
}

impl Merger<'_> {
    fn execute(
        &self,
        pb: &ProgressBar,
        invocation: &Invocation,
        domain: &str,
        locale: &str,
    ) -> Result<(), ToolFailedError> {
        if self.dry_run {
            pb.suspend(|| ui::print_command(invocation));
            return Ok(());
        }
        run_checked(self.runner, invocation, domain, locale).map(drop)
    }

    fn merge_locale(&mut self, pb: &ProgressBar, domain: &str, locale: &str) -> Result<(), CliError> {
        let template = self.project.template_path(domain);
        let catalog = self.project.catalog_path(locale, domain);

        // Source locales translate every message to its own msgid.
        let source_template = if self.project.config.is_source_locale(locale) {
            Some(self.source_template(pb, &template, domain, locale)?)
        } else {
            None
        };
        let input = source_template
            .as_ref()
            .map_or(template.as_path(), NamedTempFile::path);

        if !catalog.is_file() {
            if !self.dry_run
                && let Some(dir) = catalog.parent()
            {
                fs_err::create_dir_all(dir)?;
            }
            pb.suspend(|| ui::print_initializing(&catalog));

            let init = self
                .toolchain
                .invocation(Tool::Init)
                .arg("--no-translator")
                .arg(format!("--locale={locale}"))
                .path_option("input", input)
                .path_option("output-file", &catalog)
                .arg(format!("--width={MERGE_WIDTH}"));
            self.execute(pb, &init, domain, locale)?;
            self.summary.initialized += 1;
        }

        let mut merge = self
            .toolchain
            .invocation(Tool::Merge)
            .arg("--update")
            .arg(format!("--width={MERGE_WIDTH}"))
            .arg(if self.backup {
                "--backup=simple"
            } else {
                "--backup=off"
            });
        let compendium = self.project.compendium_path(locale);
        if compendium.is_file() {
            merge = merge.path_option("compendium", &compendium);
        }
        let merge = merge.path_arg(&catalog).path_arg(input);

        self.execute(pb, &merge, domain, locale)?;
        self.summary.merged += 1;
        Ok(())
    }

    /// Run `msgen` over the template into a temporary file.
    fn source_template(
        &self,
        pb: &ProgressBar,
        template: &Path,
        domain: &str,
        locale: &str,
    ) -> Result<NamedTempFile, CliError> {
        let output = tempfile::Builder::new()
            .prefix("tolk-")
            .suffix(".pot")
            .tempfile()?;

        let invocation = self
            .toolchain
            .invocation(Tool::En)
            .path_option("output-file", output.path())
            .path_arg(template);
        self.execute(pb, &invocation, domain, locale)?;
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gettext::testing::RecordingRunner;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    const CONFIG: &str = r#"
standalone_domains = ["django", "djangojs"]
languages = ["de", "fr", ["en-US", "English"]]
"#;

    fn touch(root: &Path, relative: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "").unwrap();
    }

    fn project(config: &str) -> (TempDir, Project) {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        fs::write(root.join("tolk.toml"), config).unwrap();
        touch(root, "locale/templates/LC_MESSAGES/django.pot");
        touch(root, "locale/templates/LC_MESSAGES/djangojs.pot");
        touch(root, "locale/de/LC_MESSAGES/django.po");
        touch(root, "locale/de/LC_MESSAGES/djangojs.po");
        fs::create_dir_all(root.join("locale/fr/LC_MESSAGES")).unwrap();
        fs::create_dir_all(root.join("locale/.git")).unwrap();
        fs::create_dir_all(root.join("locale/compendia")).unwrap();
        touch(root, "locale/README");
        let project = Project::load(Some(root)).unwrap();
        (temp, project)
    }

    fn args() -> MergeArgs {
        MergeArgs {
            project: ProjectArgs { path: None },
            create: false,
            backup: false,
            locales: Vec::new(),
            dry_run: false,
        }
    }

    fn path(project: &Project, relative: &str) -> String {
        project.locale_dir().join(relative).display().to_string()
    }

    #[test]
    fn test_list_locales_skips_reserved_dirs() {
        let (_temp, project) = project(CONFIG);
        assert_eq!(
            list_locales(&project.locale_dir()).unwrap(),
            vec!["de".to_string(), "fr".to_string()]
        );
    }

    #[test]
    fn test_merge_initializes_missing_catalogs() {
        let (_temp, project) = project(CONFIG);
        let runner = RecordingRunner::new();

        let summary = merge_project(&project, &args(), &runner).unwrap();

        assert_eq!(
            summary,
            MergeSummary {
                initialized: 2,
                merged: 4
            }
        );
        let pot = path(&project, "templates/LC_MESSAGES/django.pot");
        let de = path(&project, "de/LC_MESSAGES/django.po");
        let fr = path(&project, "fr/LC_MESSAGES/django.po");
        let lines = runner.command_lines();
        assert_eq!(lines.len(), 6);
        assert_eq!(
            lines[..3],
            [
                format!("msgmerge --update --width=200 --backup=off {de} {pot}"),
                format!(
                    "msginit --no-translator --locale=fr --input={pot} --output-file={fr} --width=200"
                ),
                format!("msgmerge --update --width=200 --backup=off {fr} {pot}"),
            ]
        );
        assert!(lines[3].contains("djangojs.po"));
    }

    #[test]
    fn test_backup_and_compendium() {
        let (temp, project) = project(CONFIG);
        touch(temp.path(), "locale/compendia/de.compendium");
        let runner = RecordingRunner::new();

        let args = MergeArgs {
            backup: true,
            locales: vec!["de".to_string()],
            ..args()
        };
        merge_project(&project, &args, &runner).unwrap();

        let calls = runner.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(
            calls[0].args[..4],
            [
                "--update".to_string(),
                "--width=200".to_string(),
                "--backup=simple".to_string(),
                format!("--compendium={}", path(&project, "compendia/de.compendium")),
            ]
        );
    }

    #[test]
    fn test_source_locale_merges_msgen_output() {
        let (_temp, project) = project(CONFIG);
        let runner = RecordingRunner::new();

        let args = MergeArgs {
            create: true,
            locales: vec!["en_US".to_string()],
            ..args()
        };
        merge_project(&project, &args, &runner).unwrap();

        assert!(project.locale_dir().join("en_US/LC_MESSAGES").is_dir());
        let calls = runner.calls();
        let tools: Vec<Tool> = calls.iter().map(|c| c.tool).collect();
        assert_eq!(
            tools[..3],
            [Tool::En, Tool::Init, Tool::Merge]
        );

        let generated = calls[0].args[0]
            .strip_prefix("--output-file=")
            .unwrap()
            .to_string();
        assert_eq!(calls[1].args[2], format!("--input={generated}"));
        assert_eq!(calls[2].args.last(), Some(&generated));
    }

    #[test]
    fn test_missing_templates_are_reported_together() {
        let (temp, project) = project(CONFIG);
        fs::remove_dir_all(temp.path().join("locale/templates")).unwrap();
        let runner = RecordingRunner::new();

        let args = MergeArgs {
            create: true,
            ..args()
        };
        let err = merge_project(&project, &args, &runner).unwrap_err();

        match err {
            CliError::MissingTemplates(report) => {
                let domains: Vec<&str> =
                    report.missing.iter().map(|m| m.domain.as_str()).collect();
                assert_eq!(domains, vec!["django", "djangojs"]);
            },
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(runner.calls().is_empty());
        assert!(!project.locale_dir().join("en_US").exists());
    }

    #[test]
    fn test_missing_tool_is_fatal() {
        let (_temp, project) = project(CONFIG);
        let runner = RecordingRunner::new().without("msgmerge");

        let err = merge_project(&project, &args(), &runner).unwrap_err();

        assert!(matches!(err, CliError::MissingTool(ref e) if e.tool == "msgmerge"));
        assert!(runner.calls().is_empty());
    }

    #[test]
    fn test_failure_stops_domain_but_not_others() {
        let (_temp, project) = project(CONFIG);
        let runner = RecordingRunner::new().failing(Tool::Merge);

        let err = merge_project(&project, &args(), &runner).unwrap_err();

        match err {
            CliError::Merge(report) => {
                assert_eq!(report.domain_count, 2);
                let failed: Vec<(&str, &str)> = report
                    .failures
                    .iter()
                    .map(|f| (f.domain.as_str(), f.locale.as_str()))
                    .collect();
                assert_eq!(failed, vec![("django", "de"), ("djangojs", "de")]);
            },
            other => panic!("unexpected error: {other:?}"),
        }
        // One msgmerge per domain, fr is never reached.
        assert_eq!(runner.calls().len(), 2);
    }

    #[test]
    fn test_unknown_locale() {
        let (_temp, project) = project(CONFIG);
        let args = MergeArgs {
            locales: vec!["pt_BR".to_string()],
            ..args()
        };
        let err = merge_project(&project, &args, &RecordingRunner::new()).unwrap_err();
        match err {
            CliError::LocaleNotFound(err) => {
                assert_eq!(err.locale, "pt_BR");
                assert_eq!(err.available, "de, fr");
            },
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_dry_run_runs_nothing() {
        let (_temp, project) = project(CONFIG);
        let runner = RecordingRunner::new();

        let args = MergeArgs {
            create: true,
            dry_run: true,
            ..args()
        };
        let summary = merge_project(&project, &args, &runner).unwrap();

        assert_eq!(summary.merged, 6);
        assert!(runner.calls().is_empty());
        assert!(!project.locale_dir().join("en_US").exists());
        assert!(!project.catalog_path("fr", "django").exists());
    }

    #[test]
    fn test_no_locales() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("tolk.toml"), "").unwrap();
        touch(temp.path(), "locale/templates/LC_MESSAGES/django.pot");
        let project = Project::load(Some(temp.path())).unwrap();

        let summary = merge_project(&project, &args(), &RecordingRunner::new()).unwrap();
        assert_eq!(summary, MergeSummary::default());
    }

    #[test]
    fn test_catalog_paths() {
        let (_temp, project) = project(CONFIG);
        assert_eq!(
            project.catalog_path("de", "django"),
            PathBuf::from(path(&project, "de/LC_MESSAGES/django.po"))
        );
    }
}
