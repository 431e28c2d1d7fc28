use crate::error::ExtractError;
use crate::extractors::{ExtractOptions, ExtractedMessage, ExtractorKind};
use crate::pattern::PathPattern;
use path_slash::PathExt as _;
use std::cmp::Ordering;
use std::path::Path;
use walkdir::{DirEntry, WalkDir};

/// A message together with the file it came from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileMessage {
    /// Path relative to the extraction root, with forward slashes.
    pub path: String,
    pub message: ExtractedMessage,
}

/// Ordered mapping from path patterns to extractors. The first matching
/// pattern wins.
pub type MethodMap = [(PathPattern, ExtractorKind)];

fn is_hidden_dir(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| name.starts_with('.') || name.starts_with('_'))
}

/// Files of a directory come before its subdirectories, each group sorted by
/// name.
fn walk_order(a: &DirEntry, b: &DirEntry) -> Ordering {
    a.file_type()
        .is_dir()
        .cmp(&b.file_type().is_dir())
        .then_with(|| a.file_name().cmp(b.file_name()))
}

/// The extractor for a relative path, if any pattern matches.
pub fn method_for<'a>(methods: &'a MethodMap, relative: &str) -> Option<&'a ExtractorKind> {
    methods
        .iter()
        .find(|(pattern, _)| pattern.matches(relative))
        .map(|(_, kind)| kind)
}

/// Extract messages from every file under `base_dir` that a method maps to an
/// extractor.
///
/// Directories whose names start with `.` or `_` are skipped. `callback` is
/// invoked with the relative path and extractor of each file before it is
/// read; files mapped to [`ExtractorKind::Ignore`] are skipped silently.
pub fn extract_from_dir<F>(
    base_dir: &Path,
    methods: &MethodMap,
    options: &ExtractOptions,
    mut callback: F,
) -> Result<Vec<FileMessage>, ExtractError>
where
    F: FnMut(&str, ExtractorKind),
{
    tracing::debug!("Extracting messages under {}", base_dir.display());

    let mut results = Vec::new();
    let walker = WalkDir::new(base_dir)
        .sort_by(walk_order)
        .into_iter()
        .filter_entry(|entry| !is_hidden_dir(entry));

    for entry in walker {
        let entry = entry.map_err(|source| ExtractError::Walk {
            path: source
                .path()
                .map_or_else(|| base_dir.to_path_buf(), Path::to_path_buf),
            source,
        })?;
        if !entry.file_type().is_file() {
            continue;
        }

        let relative = entry
            .path()
            .strip_prefix(base_dir)
            .unwrap_or(entry.path())
            .to_slash_lossy()
            .into_owned();

        let Some(&kind) = method_for(methods, &relative) else {
            continue;
        };
        if kind == ExtractorKind::Ignore {
            tracing::trace!("Ignoring {relative}");
            continue;
        }

        callback(&relative, kind);
        tracing::debug!("Extracting {relative} with {kind}");

        let messages = extract_file(entry.path(), kind, options)?;
        results.extend(messages.into_iter().map(|message| FileMessage {
            path: relative.clone(),
            message,
        }));
    }

    tracing::debug!("Found {} messages", results.len());
    Ok(results)
}

/// Read and extract a single file.
pub fn extract_file(
    path: &Path,
    kind: ExtractorKind,
    options: &ExtractOptions,
) -> Result<Vec<ExtractedMessage>, ExtractError> {
    let source = fs_err::read_to_string(path).map_err(|source| ExtractError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    match kind.extract(&source, options) {
        Ok(messages) => Ok(messages),
        Err(err) if options.template.silent => {
            tracing::warn!("Skipping {}: {err}", path.display());
            Ok(Vec::new())
        },
        Err(err) => Err(ExtractError::TemplateSyntax {
            path: path.to_path_buf(),
            line: err.line,
            message: err.message,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractors::TemplateOptions;
    use crate::trans::TransBlockStyle;
    use std::fs;
    use tempfile::TempDir;

    fn methods(pairs: &[(&str, ExtractorKind)]) -> Vec<(PathPattern, ExtractorKind)> {
        pairs
            .iter()
            .map(|(pattern, kind)| (PathPattern::new(pattern).unwrap(), *kind))
            .collect()
    }

    fn write(root: &Path, relative: &str, contents: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    fn project() -> TempDir {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        write(root, "foo.py", "_('python string')\n");
        write(root, "app/views.py", "_('view string')\n");
        write(root, "app/templates/page.html", "{% trans %}\n  page\n{% endtrans %}\n");
        write(root, ".hidden/secret.py", "_('hidden')\n");
        write(root, "_build/gen.py", "_('generated')\n");
        write(root, "vendor/lib.py", "_('vendored')\n");
        write(root, "static/app.js", "gettext('script string');\n");
        temp
    }

    #[test]
    fn test_extract_from_dir() {
        let temp = project();
        let methods = methods(&[
            ("vendor/**", ExtractorKind::Ignore),
            ("**.py", ExtractorKind::Python),
            ("**/templates/**.html", ExtractorKind::Jinja2),
            ("**.js", ExtractorKind::JavaScript),
        ]);
        let mut seen = Vec::new();
        let found = extract_from_dir(temp.path(), &methods, &ExtractOptions::default(), |path, kind| {
            seen.push((path.to_string(), kind));
        })
        .unwrap();

        assert_eq!(
            seen,
            vec![
                ("foo.py".to_string(), ExtractorKind::Python),
                ("app/views.py".to_string(), ExtractorKind::Python),
                ("app/templates/page.html".to_string(), ExtractorKind::Jinja2),
                ("static/app.js".to_string(), ExtractorKind::JavaScript),
            ]
        );
        let ids: Vec<_> = found
            .iter()
            .map(|m| (m.path.as_str(), m.message.id.msgid()))
            .collect();
        assert_eq!(
            ids,
            vec![
                ("foo.py", "python string"),
                ("app/views.py", "view string"),
                ("app/templates/page.html", "page"),
                ("static/app.js", "script string"),
            ]
        );
    }

    #[test]
    fn test_template_errors_respect_silent() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "broken.html", "{% trans %}{% if x %}{% endtrans %}");
        let methods = methods(&[("**.html", ExtractorKind::Jinja2)]);

        let mut options = ExtractOptions {
            template: TemplateOptions::new(TransBlockStyle::CollapseWhitespace),
            ..Default::default()
        };
        let err = extract_from_dir(temp.path(), &methods, &options, |_, _| {}).unwrap_err();
        assert!(matches!(err, ExtractError::TemplateSyntax { line: 1, .. }));

        options.template.silent = true;
        let found = extract_from_dir(temp.path(), &methods, &options, |_, _| {}).unwrap();
        assert!(found.is_empty());
    }

    #[test]
    fn test_missing_root_is_a_walk_error() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("nope");
        let err = extract_from_dir(&missing, &[], &ExtractOptions::default(), |_, _| {}).unwrap_err();
        assert!(matches!(err, ExtractError::Walk { .. }));
    }
}
