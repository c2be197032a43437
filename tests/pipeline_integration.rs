//! Integration tests for the deployment pipeline.
//!
//! Every test runs the full pipeline against `MockRemote`, so remote state
//! and the exact sequence of remote calls can be asserted.

use std::io::{Cursor, Write};

use bundlepush::core::config::DeploySettings;
use bundlepush::core::types::{BranchName, OwnerKind};
use bundlepush::deploy::{
    repository_for, ArchiveExtractor, BranchResolver, DeployError, DeploymentPipeline, ErrorKind,
    RepoProvisioner,
};
use bundlepush::forge::mock::{FailOn, MockOperation, MockRemote};
use bundlepush::forge::{RemoteError, ResponseBody};
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

// =============================================================================
// Helpers
// =============================================================================

fn zip_of(members: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, content) in members {
        writer
            .start_file(*name, SimpleFileOptions::default())
            .unwrap();
        writer.write_all(content).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

fn numbered_zip(count: usize) -> Vec<u8> {
    let names: Vec<String> = (0..count).map(|i| format!("assets/{:04}.txt", i)).collect();
    let members: Vec<(&str, &[u8])> = names.iter().map(|n| (n.as_str(), &b"x"[..])).collect();
    zip_of(&members)
}

fn settings() -> DeploySettings {
    DeploySettings {
        max_files: 1200,
        blob_concurrency: 4,
        commit_message: "Deploy from bundlepush".into(),
    }
}

fn main_branch() -> BranchName {
    BranchName::new("main").unwrap()
}

fn position(ops: &[MockOperation], pred: impl Fn(&MockOperation) -> bool) -> usize {
    ops.iter().position(pred).expect("operation not recorded")
}

// =============================================================================
// Scenarios
// =============================================================================

mod scenarios {
    use super::*;

    #[tokio::test]
    async fn new_repository_is_created_private_and_deployed() {
        let remote = MockRemote::new("acme");
        let config = repository_for(&remote, OwnerKind::User, "demo", true).unwrap();
        let archive = zip_of(&[
            ("index.html", b"<h1>hi</h1>"),
            ("css/site.css", b"body{}"),
            ("js/app.js", b"console.log(1)"),
        ]);

        let result = DeploymentPipeline::new(&remote, settings())
            .run(&config, &main_branch(), &archive)
            .await
            .unwrap();

        assert!(result.ok);
        assert_eq!(result.owner_account, "acme");
        assert_eq!(result.repo_name, "demo");
        assert_eq!(result.branch_name, "main");
        assert_eq!(result.file_count, 3);
        assert!(!result.new_commit_sha.is_empty());
        assert!(result.warnings.is_empty());

        assert_eq!(remote.is_private("demo"), Some(true));
        assert_eq!(
            remote.branch_head("demo", "main"),
            Some(result.new_commit_sha.clone())
        );
        let files = remote.files_at("demo", &result.new_commit_sha).unwrap();
        assert_eq!(files["index.html"], b"<h1>hi</h1>".to_vec());
        assert_eq!(files["js/app.js"], b"console.log(1)".to_vec());
    }

    #[tokio::test]
    async fn sensitive_file_warns_but_deploys() {
        let remote = MockRemote::new("acme").with_repository("demo", true);
        let config = repository_for(&remote, OwnerKind::User, "demo", true).unwrap();
        let archive = zip_of(&[("index.html", b"ok"), ("config/.env", b"SECRET=1")]);

        let result = DeploymentPipeline::new(&remote, settings())
            .run(&config, &main_branch(), &archive)
            .await
            .unwrap();

        assert_eq!(result.file_count, 2);
        assert_eq!(result.warnings.len(), 1);
        assert_eq!(result.warnings[0].path, "config/.env");
        let files = remote.files_at("demo", &result.new_commit_sha).unwrap();
        assert!(files.contains_key("config/.env"));
    }

    #[tokio::test]
    async fn oversized_archive_writes_nothing() {
        let remote = MockRemote::new("acme").with_repository("demo", true);
        let before = remote.branch_head("demo", "main");
        let config = repository_for(&remote, OwnerKind::User, "demo", true).unwrap();

        let err = DeploymentPipeline::new(&remote, settings())
            .run(&config, &main_branch(), &numbered_zip(1500))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            DeployError::LimitExceeded {
                count: 1500,
                limit: 1200
            }
        ));
        assert_eq!(err.status_code(), 413);
        assert_eq!(
            remote.operations(),
            vec![MockOperation::GetRepository {
                repo: "demo".into()
            }]
        );
        assert_eq!(remote.blob_count("demo"), 1);
        assert_eq!(remote.branch_head("demo", "main"), before);
    }

    #[tokio::test]
    async fn consecutive_deploys_chain_parents() {
        let remote = MockRemote::new("acme").with_repository("demo", true);
        let x = remote.branch_head("demo", "main").unwrap();
        let config = repository_for(&remote, OwnerKind::User, "demo", true).unwrap();
        let pipeline = DeploymentPipeline::new(&remote, settings());

        let first = pipeline
            .run(&config, &main_branch(), &zip_of(&[("v.txt", b"1")]))
            .await
            .unwrap();
        let y = first.new_commit_sha.clone();
        let second = pipeline
            .run(&config, &main_branch(), &zip_of(&[("v.txt", b"2")]))
            .await
            .unwrap();

        assert_eq!(remote.commit("demo", &y).unwrap().parents, vec![x]);
        assert_eq!(
            remote.commit("demo", &second.new_commit_sha).unwrap().parents,
            vec![y]
        );
        let files = remote.files_at("demo", &second.new_commit_sha).unwrap();
        assert_eq!(files["v.txt"], b"2".to_vec());
    }

    #[tokio::test]
    async fn public_repository_is_made_private_before_branch_work() {
        let remote = MockRemote::new("acme").with_repository("demo", false);
        let config = repository_for(&remote, OwnerKind::User, "demo", true).unwrap();

        DeploymentPipeline::new(&remote, settings())
            .run(&config, &main_branch(), &zip_of(&[("a.txt", b"a")]))
            .await
            .unwrap();

        assert_eq!(remote.is_private("demo"), Some(true));
        let ops = remote.operations();
        let patch = position(&ops, |op| {
            matches!(op, MockOperation::SetVisibility { private: true, .. })
        });
        let first_branch_read = position(&ops, |op| {
            matches!(op, MockOperation::GetBranchHead { .. })
        });
        assert!(patch < first_branch_read);
    }
}

// =============================================================================
// Properties
// =============================================================================

mod properties {
    use super::*;

    #[tokio::test]
    async fn ensure_is_idempotent() {
        let remote = MockRemote::new("acme");
        let config = repository_for(&remote, OwnerKind::Org, "demo", true).unwrap();
        let provisioner = RepoProvisioner::new(&remote);

        provisioner.ensure(&config).await.unwrap();
        remote.clear_operations();
        provisioner.ensure(&config).await.unwrap();

        assert_eq!(remote.repository_count(), 1);
        assert_eq!(remote.is_private("demo"), Some(true));
        assert!(remote.operations().iter().all(|op| !op.is_mutation()));
    }

    #[tokio::test]
    async fn empty_archive_is_rejected() {
        let remote = MockRemote::new("acme").with_repository("demo", true);
        let config = repository_for(&remote, OwnerKind::User, "demo", true).unwrap();

        let err = DeploymentPipeline::new(&remote, settings())
            .run(&config, &main_branch(), &zip_of(&[(".git/HEAD", b"ref")]))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(remote.operations().iter().all(|op| !op.is_object_write()));
    }

    #[test]
    fn retained_paths_are_normalized() {
        let archive = zip_of(&[
            ("/lead.txt", b"1"),
            ("dir\\win.txt", b"2"),
            (".git/config", b"3"),
            ("ok/file.txt", b"4"),
        ]);
        let extracted = ArchiveExtractor::new(10).extract(&archive).unwrap();
        for entry in &extracted.entries {
            assert!(!entry.path.is_empty());
            assert!(!entry.path.starts_with('/'));
            assert!(!entry.path.contains('\\'));
            assert!(!entry.path.starts_with(".git/"));
        }
        assert_eq!(extracted.entries.len(), 3);
    }

    #[tokio::test]
    async fn missing_branch_forks_from_default_head() {
        let remote = MockRemote::new("acme").with_repository("demo", true);
        let d = remote.branch_head("demo", "main").unwrap();

        let resolved = BranchResolver::new(&remote)
            .resolve(
                &bundlepush::core::types::RepoName::new("demo").unwrap(),
                &BranchName::new("feature").unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(resolved.head_commit_sha, d);
        assert_eq!(remote.branch_head("demo", "feature"), Some(d));
    }

    #[tokio::test]
    async fn commit_has_single_parent_and_overlays_base_tree() {
        let remote = MockRemote::new("acme").with_repository("demo", true);
        let base = remote.branch_head("demo", "main").unwrap();
        let base_tree = remote.commit("demo", &base).unwrap().tree;
        let config = repository_for(&remote, OwnerKind::User, "demo", true).unwrap();

        let result = DeploymentPipeline::new(&remote, settings())
            .run(&config, &main_branch(), &zip_of(&[("new.txt", b"n")]))
            .await
            .unwrap();

        let commit = remote.commit("demo", &result.new_commit_sha).unwrap();
        assert_eq!(commit.parents, vec![base]);
        let tree_base = remote
            .operations()
            .into_iter()
            .find_map(|op| match op {
                MockOperation::CreateTree { base_tree, .. } => Some(base_tree),
                _ => None,
            })
            .unwrap();
        assert_eq!(tree_base, base_tree);

        let files = remote.files_at("demo", &result.new_commit_sha).unwrap();
        assert!(files.contains_key("README.md"));
        assert!(files.contains_key("new.txt"));
    }

    #[tokio::test]
    async fn ref_update_is_forced_and_last() {
        let remote = MockRemote::new("acme").with_repository("demo", true);
        let config = repository_for(&remote, OwnerKind::User, "demo", true).unwrap();
        let pipeline = DeploymentPipeline::new(&remote, settings());

        let first = pipeline
            .run(&config, &main_branch(), &zip_of(&[("a", b"1")]))
            .await
            .unwrap();
        // Someone rewinds the branch; the next deploy still lands on top of whatever is there.
        let readme_only = remote.commit("demo", &first.new_commit_sha).unwrap().parents[0].clone();
        remote.set_branch_head("demo", "main", &readme_only);

        let second = pipeline
            .run(&config, &main_branch(), &zip_of(&[("b", b"2")]))
            .await
            .unwrap();

        assert_eq!(
            remote.branch_head("demo", "main"),
            Some(second.new_commit_sha.clone())
        );
        assert!(matches!(
            remote.operations().last(),
            Some(MockOperation::UpdateRef { .. })
        ));
    }
}

// =============================================================================
// Failures
// =============================================================================

mod failures {
    use super::*;

    #[tokio::test]
    async fn blob_failure_leaves_branch_untouched() {
        let remote = MockRemote::new("acme")
            .with_repository("demo", true)
            .fail_on(FailOn::CreateBlobAfter(
                1,
                RemoteError::Status {
                    status: 500,
                    message: "Server Error".into(),
                    body: ResponseBody::Empty,
                },
            ));
        let before = remote.branch_head("demo", "main");
        let config = repository_for(&remote, OwnerKind::User, "demo", true).unwrap();

        let err = DeploymentPipeline::new(&remote, settings())
            .run(&config, &main_branch(), &numbered_zip(3))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Upstream);
        assert_eq!(err.status_code(), 500);
        assert_eq!(remote.branch_head("demo", "main"), before);
        assert!(!remote
            .operations()
            .iter()
            .any(|op| matches!(op, MockOperation::UpdateRef { .. })));
    }

    #[tokio::test]
    async fn branch_read_failure_is_fatal() {
        let remote = MockRemote::new("acme")
            .with_repository("demo", true)
            .fail_on(FailOn::GetBranchHead(RemoteError::Status {
                status: 401,
                message: "Bad credentials".into(),
                body: ResponseBody::decode(r#"{"message":"Bad credentials"}"#),
            }));
        let config = repository_for(&remote, OwnerKind::User, "demo", true).unwrap();

        let err = DeploymentPipeline::new(&remote, settings())
            .run(&config, &main_branch(), &zip_of(&[("a", b"1")]))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Upstream);
        assert_eq!(err.status_code(), 401);
        assert_eq!(err.details().and_then(|d| d.message()), Some("Bad credentials"));
        assert!(!remote
            .operations()
            .iter()
            .any(|op| matches!(op, MockOperation::CreateBranch { .. })));
    }

    #[tokio::test]
    async fn ref_update_failure_reports_upstream() {
        let remote = MockRemote::new("acme")
            .with_repository("demo", true)
            .fail_on(FailOn::UpdateRef(RemoteError::Status {
                status: 422,
                message: "Update is not a fast forward".into(),
                body: ResponseBody::Empty,
            }));
        let before = remote.branch_head("demo", "main");
        let config = repository_for(&remote, OwnerKind::User, "demo", true).unwrap();

        let err = DeploymentPipeline::new(&remote, settings())
            .run(&config, &main_branch(), &zip_of(&[("a", b"1")]))
            .await
            .unwrap_err();

        assert_eq!(err.status_code(), 422);
        assert_eq!(remote.branch_head("demo", "main"), before);
    }
}
