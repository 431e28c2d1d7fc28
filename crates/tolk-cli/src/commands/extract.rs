use crate::commands::common::ProjectArgs;
use crate::core::{CliError, ExtractedDomain, OutputDirNotFoundError, Project, TEMPLATES_DIR};
use crate::gettext::{SystemRunner, Tool, ToolRunner, Toolchain, run_checked};
use crate::utils::ui;
use clap::Parser;
use std::io::{BufWriter, Write as _};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tolk_extract::{Catalog, Location, extract_from_dir, po};

/// Value of `--domain` that selects every configured domain.
pub const ALL_DOMAINS: &str = "all";

/// Arguments for the extract command.
#[derive(Debug, Clone, Parser)]
pub struct ExtractArgs {
    #[command(flatten)]
    pub project: ProjectArgs,

    /// Domain to extract, or `all`.
    #[arg(short, long, default_value = ALL_DOMAINS)]
    pub domain: String,

    /// Where to write the templates (defaults to <locale_dir>/templates/LC_MESSAGES).
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Create the output directory if it doesn't exist.
    #[arg(short, long)]
    pub create: bool,
}

/// Run the extract command.
pub fn run_extract(args: ExtractArgs) -> Result<(), CliError> {
    let project = args.project.load()?;
    ui::print_extract_header();
    extract_project(&project, &args, &SystemRunner)?;
    Ok(())
}

/// Extract the selected domains of `project` into `.pot` templates.
///
/// When more than one non-standalone domain is extracted, their templates
/// are combined into `<text_domain>.pot` with `msgcat` and removed.
pub fn extract_project(
    project: &Project,
    args: &ExtractArgs,
    runner: &dyn ToolRunner,
) -> Result<Vec<ExtractedDomain>, CliError> {
    let config = &project.config;

    let domains = if args.domain == ALL_DOMAINS {
        config.domain_names()
    } else {
        config.domain(&args.domain)?;
        vec![args.domain.clone()]
    };
    if domains.is_empty() {
        ui::print_no_domains();
        return Ok(Vec::new());
    }

    let toolchain = Toolchain::new(&config.tools);
    let combined_count = domains.iter().filter(|d| !config.is_standalone(d)).count();
    if combined_count > 1 {
        toolchain.require(runner, &[Tool::Concat])?;
    }

    let mut method_maps = Vec::with_capacity(domains.len());
    let mut uses_templates = false;
    for domain in &domains {
        let domain = config.domain(domain)?;
        uses_templates |= domain.uses_templates();
        method_maps.push(domain.method_map()?);
    }
    let options = config.extract_options(uses_templates)?;

    let output_dir = args
        .output_dir
        .clone()
        .unwrap_or_else(|| project.templates_dir());
    ensure_output_dir(&output_dir, args.create)?;

    let base_dir = project.base_dir();
    let metadata = config.catalog_metadata();
    let mut extracted = Vec::with_capacity(domains.len());

    for (domain, methods) in domains.iter().zip(&method_maps) {
        let start = Instant::now();
        ui::print_extracting(domain);

        let pb = ui::create_spinner(&format!("Scanning {}", base_dir.display()));
        let found = extract_from_dir(&base_dir, methods, &options, |path, _| {
            pb.set_message(path.to_string());
        });
        pb.finish_and_clear();

        let mut catalog = Catalog::new(metadata.clone());
        for file in found? {
            catalog.add(
                file.message.id,
                file.message.context,
                Location::new(file.path, file.message.lineno),
                file.message.comments,
            );
        }

        let path = output_dir.join(format!("{domain}.pot"));
        write_template(&path, &catalog)?;
        ui::print_extracted(domain, &path, catalog.len(), start.elapsed());

        extracted.push(ExtractedDomain {
            domain: domain.clone(),
            path,
            message_count: catalog.len(),
        });
    }

    if combined_count > 1 {
        combine_templates(project, &toolchain, runner, &output_dir, &extracted)?;
    }

    Ok(extracted)
}

fn ensure_output_dir(path: &Path, create: bool) -> Result<(), CliError> {
    if path.is_dir() {
        return Ok(());
    }
    if !create {
        return Err(OutputDirNotFoundError {
            path: path.to_path_buf(),
        }
        .into());
    }

    ui::print_creating_dir(path);
    fs_err::create_dir_all(path)?;
    Ok(())
}

fn write_template(path: &Path, catalog: &Catalog) -> Result<(), CliError> {
    let mut writer = BufWriter::new(fs_err::File::create(path)?);
    po::write_pot(&mut writer, catalog, po::DEFAULT_WIDTH)?;
    writer.flush()?;
    tracing::debug!("Wrote {} messages to {}", catalog.len(), path.display());
    Ok(())
}

/// Concatenate the templates of the non-standalone domains into
/// `<text_domain>.pot`.
fn combine_templates(
    project: &Project,
    toolchain: &Toolchain,
    runner: &dyn ToolRunner,
    output_dir: &Path,
    extracted: &[ExtractedDomain],
) -> Result<PathBuf, CliError> {
    let config = &project.config;
    let inputs: Vec<&ExtractedDomain> = extracted
        .iter()
        .filter(|d| !config.is_standalone(&d.domain))
        .collect();
    let combined = output_dir.join(format!("{}.pot", config.text_domain));

    // An existing combined template (the standalone text domain by default)
    // leads the inputs so its messages survive the rewrite.
    let mut sources: Vec<&Path> = Vec::with_capacity(inputs.len() + 1);
    if combined.is_file() && inputs.iter().all(|d| d.path != combined) {
        sources.push(&combined);
    }
    sources.extend(inputs.iter().map(|d| d.path.as_path()));

    // msgcat writes next to the inputs, then replaces the combined file in one step.
    let staged = tempfile::Builder::new()
        .prefix(".tolk-")
        .suffix(".pot")
        .tempfile_in(output_dir)?;

    let invocation = sources.iter().fold(
        toolchain
            .invocation(Tool::Concat)
            .arg("--use-first")
            .arg(format!("--width={}", po::DEFAULT_WIDTH))
            .path_option("output-file", staged.path()),
        |invocation, source| invocation.path_arg(source),
    );
    run_checked(runner, &invocation, &config.text_domain, TEMPLATES_DIR)?;

    staged.persist(&combined).map_err(|err| err.error)?;
    for input in &inputs {
        if input.path != combined {
            fs_err::remove_file(&input.path)?;
        }
    }

    let names: Vec<String> = inputs.iter().map(|d| d.domain.clone()).collect();
    ui::print_concatenated(&combined, &names);
    Ok(combined)
}
