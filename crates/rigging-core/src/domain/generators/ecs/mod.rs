//! Container pipelines for ECS services.
//!
//! `build` owns the reusable image build/publish workflow, `ci` wires it
//! into the build workflow, `deploy` owns the Harness deploy workflows and
//! `cd` wires those into the release workflow.

pub mod build;
pub mod cd;
pub mod ci;
pub mod deploy;

use serde::{Deserialize, Serialize};

use crate::domain::workflow::{Step, Workflow};

/// Node.js used by the image build jobs when nothing else is configured.
pub const DEFAULT_NODE_VERSION: &str = "16";

/// `nick-fields/retry` v2.8.3.
pub const RETRY_ACTION: &str = "nick-fields/retry@943e742917ac94714d2f408a0e8320f2d1fcafcd";

/// ECR repository holding draft and per-commit images.
pub const BUILDCACHE_REPO: &str = "monorepo-buildcache";

const ORG_ACTIONS_REF: &str = "53f03c9bc36389e6b4e671bd8a3cc6286ef37044";

pub(crate) const REPO_URI: &str = "${{ steps.buildcache.outputs.docker-repo-uri }}";

/// Architectures the self-hosted runners can build for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildArchitecture {
    Arm64,
    Amd64,
}

impl BuildArchitecture {
    pub const ALL: [BuildArchitecture; 2] = [Self::Arm64, Self::Amd64];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Arm64 => "arm64",
            Self::Amd64 => "amd64",
        }
    }

    /// Label selecting a self-hosted runner of this architecture.
    pub fn runner_label(&self) -> &'static str {
        match self {
            Self::Arm64 => "ARM64",
            Self::Amd64 => "X64",
        }
    }

    /// Value of the `ARCH` docker build argument.
    pub fn docker_arch(&self) -> &'static str {
        match self {
            Self::Arm64 => "arm64v8",
            Self::Amd64 => "amd64",
        }
    }

    pub fn build_job_id(&self) -> String {
        format!("docker-build-{}", self.as_str())
    }

    /// `arm64, amd64`
    pub fn supported() -> String {
        Self::ALL
            .iter()
            .map(|arch| arch.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// `items` with repeats dropped, keeping the first occurrence of each.
pub(crate) fn first_occurrences<T: PartialEq + Copy>(items: &[T]) -> Vec<T> {
    let mut unique = Vec::with_capacity(items.len());
    for item in items {
        if !unique.contains(item) {
            unique.push(*item);
        }
    }
    unique
}

/// An action published from the organization's shared actions repository.
pub(crate) fn org_action(name: &str) -> String {
    format!("time-loop/github-actions/dist/{name}@{ORG_ACTIONS_REF}")
}

/// Log in to the build cache registry; exposes `steps.buildcache`.
pub(crate) fn buildcache_login_step() -> Step {
    Step::uses("Buildcache Repo Login", org_action("docker-ecr-login"))
        .with_id("buildcache")
        .with_input(
            "aws-access-key-id",
            "${{ secrets.ECR_BUILD_CACHE_AWS_ACCESS_KEY_ID }}",
        )
        .with_input(
            "aws-secret-access-key",
            "${{ secrets.ECR_BUILD_CACHE_AWS_SECRET_ACCESS_KEY }}",
        )
        .with_input("aws-region", "${{ secrets.ECR_BUILD_CACHE_AWS_REGION }}")
        .with_input("ecr-repo-name", BUILDCACHE_REPO)
}

/// The docker tag variables shared by the build and deploy workflows.
pub(crate) fn with_docker_tag_env(workflow: Workflow) -> Workflow {
    workflow
        .env_var(
            "DOCKER_TAG_COMMIT",
            "git-sha-${{ inputs.service-name }}-${GITHUB_SHA}",
        )
        .env_var(
            "DOCKER_TAG_BASE",
            r"git-ref-${{ inputs.service-name }}-${GITHUB_BASE_REF//\//-}",
        )
        .env_var(
            "DOCKER_TAG_HEAD",
            r"git-ref-${{ inputs.service-name }}-${GITHUB_HEAD_REF//\//-}",
        )
        .env_var(
            "DOCKER_TAG_CUR",
            r"git-ref-${{ inputs.service-name }}-${GITHUB_REF_NAME//\//-}",
        )
        .env_var(
            "DOCKER_TAG_DRAFT_COMMIT",
            "draft-git-sha-${{ inputs.service-name }}-${GITHUB_SHA}",
        )
        .env_var(
            "DOCKER_TAG_DRAFT_CUR",
            r"draft-git-ref-${{ inputs.service-name }}-${GITHUB_REF_NAME//\//-}",
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn architectures_map_to_runners_and_docker_args() {
        assert_eq!(BuildArchitecture::Arm64.runner_label(), "ARM64");
        assert_eq!(BuildArchitecture::Amd64.runner_label(), "X64");
        assert_eq!(BuildArchitecture::Arm64.docker_arch(), "arm64v8");
        assert_eq!(BuildArchitecture::Amd64.build_job_id(), "docker-build-amd64");
        assert_eq!(BuildArchitecture::supported(), "arm64, amd64");
    }

    #[test]
    fn architectures_deserialize_lowercase() {
        let archs: Vec<BuildArchitecture> = serde_json::from_str(r#"["amd64","arm64"]"#).unwrap();
        assert_eq!(archs, [BuildArchitecture::Amd64, BuildArchitecture::Arm64]);
    }

    #[test]
    fn login_step_targets_buildcache() {
        let step = buildcache_login_step();
        assert_eq!(step.id.as_deref(), Some("buildcache"));
        assert!(step.action_ref().unwrap().ends_with(ORG_ACTIONS_REF));
    }
}
