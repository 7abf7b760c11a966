//! Evaluation of `{{ .Field }}` templates against the release context.
//!
//! Only plain field lookups are supported. `{{-` and `-}}` trim the
//! whitespace on that side of the action. Unknown fields fail instead of
//! rendering empty, so a typo in a config never reaches a published manifest.

use crate::artifact::Artifact;
use crate::context::{Context, ReleaseMetadata};
use nixpub_core::{NixpubError, NixpubResult, TemplateError};
use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;

const ACTION_PATTERN: &str = r"(?s)\{\{(-\s+)?\s*(.*?)\s*(\s+-)?\}\}";

static ACTION_RE: OnceLock<Regex> = OnceLock::new();

fn action_regex() -> Result<&'static Regex, TemplateError> {
    if let Some(re) = ACTION_RE.get() {
        return Ok(re);
    }
    let re = Regex::new(ACTION_PATTERN).map_err(|e| TemplateError::Engine(e.to_string()))?;
    Ok(ACTION_RE.get_or_init(|| re))
}

/// Template evaluator bound to a release and, optionally, one artifact.
#[derive(Debug, Clone, Copy)]
pub struct Template<'a> {
    release: &'a ReleaseMetadata,
    env: &'a HashMap<String, String>,
    artifact: Option<&'a Artifact>,
}

impl<'a> Template<'a> {
    pub fn new(ctx: &'a Context) -> Self {
        Self::from_parts(&ctx.release, &ctx.env)
    }

    pub fn from_parts(release: &'a ReleaseMetadata, env: &'a HashMap<String, String>) -> Self {
        Self {
            release,
            env,
            artifact: None,
        }
    }

    /// Expose the artifact fields (`.ArtifactName`, `.Os`, ...) as well
    pub fn with_artifact(mut self, artifact: &'a Artifact) -> Self {
        self.artifact = Some(artifact);
        self
    }

    pub fn release(&self) -> &'a ReleaseMetadata {
        self.release
    }

    /// Evaluate `input`, tagging failures with the role of the field
    pub fn apply_field(&self, field: &'static str, input: &str) -> NixpubResult<String> {
        self.apply(input)
            .map_err(|source| NixpubError::template(field, source))
    }

    /// Evaluate `input`
    pub fn apply(&self, input: &str) -> Result<String, TemplateError> {
        let re = action_regex()?;
        let mut out = String::with_capacity(input.len());
        let mut last = 0;
        let mut trim_next = false;

        for caps in re.captures_iter(input) {
            let Some(whole) = caps.get(0) else {
                continue;
            };

            let literal = &input[last..whole.start()];
            push_literal(&mut out, literal, trim_next)?;
            if caps.get(1).is_some() {
                let trimmed = out.trim_end().len();
                out.truncate(trimmed);
            }

            let action = caps.get(2).map(|m| m.as_str()).unwrap_or_default();
            out.push_str(&self.lookup(action)?);

            trim_next = caps.get(3).is_some();
            last = whole.end();
        }

        push_literal(&mut out, &input[last..], trim_next)?;
        Ok(out)
    }

    fn lookup(&self, action: &str) -> Result<String, TemplateError> {
        let Some(key) = action.strip_prefix('.') else {
            return Err(TemplateError::UnsupportedAction(action.to_string()));
        };
        if key.is_empty() || key.contains(char::is_whitespace) || key.contains('|') {
            return Err(TemplateError::UnsupportedAction(action.to_string()));
        }

        if let Some(name) = key.strip_prefix("Env.") {
            return self
                .env
                .get(name)
                .cloned()
                .ok_or_else(|| TemplateError::MissingEnv(name.to_string()));
        }

        let release = self.release;
        let value = match key {
            "ProjectName" => release.project_name.clone(),
            "Version" => release.version.clone(),
            "Tag" => release.tag.clone(),
            "PreviousTag" => release.previous_tag.clone(),
            "Major" => release.semver.major.to_string(),
            "Minor" => release.semver.minor.to_string(),
            "Patch" => release.semver.patch.to_string(),
            "Prerelease" => release.semver.prerelease.clone(),
            "Date" => release.date.clone(),
            _ => return self.lookup_artifact(key),
        };
        Ok(value)
    }

    fn lookup_artifact(&self, key: &str) -> Result<String, TemplateError> {
        let Some(artifact) = self.artifact else {
            return Err(TemplateError::UnknownField(key.to_string()));
        };
        let value = match key {
            "ArtifactName" => artifact.name.clone(),
            "ArtifactPath" => artifact.path.display().to_string(),
            "ArtifactID" => artifact.id().to_string(),
            "Os" => artifact.os.clone(),
            "Arch" => artifact.arch.clone(),
            "Arm" => artifact.arm.clone(),
            "Amd64" => artifact.amd64.clone(),
            _ => return Err(TemplateError::UnknownField(key.to_string())),
        };
        Ok(value)
    }
}

fn push_literal(out: &mut String, literal: &str, trim_start: bool) -> Result<(), TemplateError> {
    if literal.contains("{{") {
        return Err(TemplateError::Unclosed(literal.to_string()));
    }
    if trim_start {
        out.push_str(literal.trim_start());
    } else {
        out.push_str(literal);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::{ArtifactExtra, ArtifactKind};
    use nixpub_core::core::version::Semver;
    use std::path::PathBuf;

    fn release() -> ReleaseMetadata {
        ReleaseMetadata {
            project_name: "foo".to_string(),
            version: "1.2.1".to_string(),
            tag: "v1.2.1".to_string(),
            previous_tag: "v1.2.0".to_string(),
            semver: Semver::new(1, 2, 1, "rc1"),
            date: "2024-01-01T00:00:00+00:00".to_string(),
        }
    }

    fn archive() -> Artifact {
        Artifact {
            name: "foo_linux_arm64.tar.gz".to_string(),
            path: PathBuf::from("dist/foo_linux_arm64.tar.gz"),
            os: "linux".to_string(),
            arch: "arm64".to_string(),
            arm: String::new(),
            amd64: String::new(),
            kind: ArtifactKind::UploadableArchive,
            extra: ArtifactExtra {
                id: "foo".to_string(),
                format: "tar.gz".to_string(),
                ..Default::default()
            },
        }
    }

    #[test]
    fn test_release_fields() {
        let release = release();
        let env = HashMap::new();
        let tpl = Template::from_parts(&release, &env);
        assert_eq!(
            tpl.apply("{{ .ProjectName }}: {{ .PreviousTag }} -> {{.Tag}}").unwrap(),
            "foo: v1.2.0 -> v1.2.1"
        );
        assert_eq!(
            tpl.apply("{{ .Major }}.{{ .Minor }}.{{ .Patch }}-{{ .Prerelease }}").unwrap(),
            "1.2.1-rc1"
        );
        assert_eq!(tpl.apply("plain text").unwrap(), "plain text");
        assert_eq!(tpl.apply("").unwrap(), "");
    }

    #[test]
    fn test_env_lookup() {
        let release = release();
        let env = HashMap::from([("OWNER".to_string(), "goreleaser".to_string())]);
        let tpl = Template::from_parts(&release, &env);
        assert_eq!(tpl.apply("{{ .Env.OWNER }}/nur").unwrap(), "goreleaser/nur");
        assert_eq!(
            tpl.apply("{{ .Env.MISSING }}"),
            Err(TemplateError::MissingEnv("MISSING".to_string()))
        );
    }

    #[test]
    fn test_unknown_field_fails() {
        let release = release();
        let env = HashMap::new();
        let tpl = Template::from_parts(&release, &env);
        assert_eq!(
            tpl.apply("{{ .Nope }}"),
            Err(TemplateError::UnknownField("Nope".to_string()))
        );
        // artifact fields need an artifact
        assert_eq!(
            tpl.apply("{{ .ArtifactName }}"),
            Err(TemplateError::UnknownField("ArtifactName".to_string()))
        );
    }

    #[test]
    fn test_apply_field_names_role() {
        let release = release();
        let env = HashMap::new();
        let err = Template::from_parts(&release, &env)
            .apply_field("description", "{{ .Nope }}")
            .unwrap_err();
        assert!(matches!(
            err,
            NixpubError::Template {
                field: "description",
                source: TemplateError::UnknownField(_)
            }
        ));
    }

    #[test]
    fn test_artifact_fields() {
        let release = release();
        let env = HashMap::new();
        let art = archive();
        let tpl = Template::from_parts(&release, &env).with_artifact(&art);
        assert_eq!(
            tpl.apply("https://dummyhost/download/{{ .Tag }}/{{ .ArtifactName }}").unwrap(),
            "https://dummyhost/download/v1.2.1/foo_linux_arm64.tar.gz"
        );
        assert_eq!(tpl.apply("{{ .Os }}-{{ .Arch }}-{{ .ArtifactID }}").unwrap(), "linux-arm64-foo");
    }

    #[test]
    fn test_trim_markers() {
        let release = release();
        let env = HashMap::new();
        let tpl = Template::from_parts(&release, &env);
        assert_eq!(tpl.apply("a   {{- .Version -}}   b").unwrap(), "a1.2.1b");
        assert_eq!(tpl.apply("a {{ .Version -}}\n  b").unwrap(), "a 1.2.1b");
    }

    #[test]
    fn test_malformed_actions() {
        let release = release();
        let env = HashMap::new();
        let tpl = Template::from_parts(&release, &env);
        assert!(matches!(
            tpl.apply("{{ .Version"),
            Err(TemplateError::Unclosed(_))
        ));
        assert!(matches!(
            tpl.apply("{{ Version }}"),
            Err(TemplateError::UnsupportedAction(_))
        ));
        assert!(matches!(
            tpl.apply("{{ .Version | upper }}"),
            Err(TemplateError::UnsupportedAction(_))
        ));
    }
}
