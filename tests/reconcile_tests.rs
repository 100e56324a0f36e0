#![cfg(unix)]

use clearcase_navigator::core::{
    cleartool::{VersionControl, ViewType},
    command_init::{CommandContext, CommandInit},
    config::Settings,
    error::ClearCaseError,
    file_status::GroupKind,
    host::NotifyLevel,
    process::{CommandRequest, FailurePolicy},
    reconcile::{Reconciler, SaveOutcome},
    version::VersionState,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

mod common;
use common::{fixtures::*, host::RecordingHost, view::*};

fn wire(view: &TestView, settings: Settings, host: RecordingHost) -> (CommandContext, Arc<RecordingHost>, Reconciler) {
    let context = CommandInit::with_settings(view.path.clone(), settings);
    let host = Arc::new(host);
    let reconciler = context.reconciler(host.clone());
    (context, host, reconciler)
}

fn group(reconciler: &Reconciler, kind: GroupKind) -> Vec<PathBuf> {
    reconciler.groups().files(kind).into_iter().map(|f| f.path).collect()
}

#[cfg(test)]
mod reconcile_tests {
    use super::*;

    #[tokio::test]
    async fn test_checkout_runs_template_and_fills_checkout_group() -> anyhow::Result<()> {
        let view = create_single_file_view()?;
        let file = view.file("f.txt");
        let (_context, host, reconciler) = wire(&view, view.settings(), RecordingHost::default());

        reconciler.checkout(&file).await?;

        assert!(view.argv_log().contains(&format!("co -nc {}", file.display())));
        assert_eq!(group(&reconciler, GroupKind::Checkout), vec![file.clone()]);
        let info = host.messages(NotifyLevel::Info);
        assert_eq!(info, vec!["Checked out \"f.txt\" from version \"/main/1\"."]);
        Ok(())
    }

    #[tokio::test]
    async fn test_checkin_prompts_for_comment_and_clears_checkout() -> anyhow::Result<()> {
        let view = create_single_file_view()?;
        let file = view.file("f.txt");
        let settings = Settings {
            checkin_template: "-c ${comment} ${filename}".to_string(),
            ..view.settings()
        };
        let (_context, _host, reconciler) = wire(&view, settings, RecordingHost::answering(true, Some("fix typo")));

        reconciler.checkout(&file).await?;
        reconciler.checkin(&file, Some("")).await?;

        assert!(view.argv_log().contains(&format!("ci -c fix typo {}", file.display())));
        assert!(group(&reconciler, GroupKind::Checkout).is_empty());
        assert!(view.checkouts().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_snapshot_checkout_gets_usehijack() -> anyhow::Result<()> {
        let view = create_single_file_view()?;
        view.set_snapshot()?;
        let file = view.file("f.txt");
        let (context, _host, reconciler) = wire(&view, view.settings(), RecordingHost::default());

        assert_eq!(context.cleartool.view_type().await, ViewType::Snapshot);
        reconciler.checkout(&file).await?;

        assert!(view.argv_log().contains(&format!("co -usehijack -nc {}", file.display())));
        // Detected once per client
        let lsviews = view.argv_log().iter().filter(|l| l.starts_with("lsview")).count();
        assert_eq!(lsviews, 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_refresh_all_classifies_mixed_view() -> anyhow::Result<()> {
        let view = create_mixed_view()?;
        let (_context, host, reconciler) = wire(&view, view.settings(), RecordingHost::default());

        reconciler.refresh_all().await?;

        assert_eq!(group(&reconciler, GroupKind::Checkout), vec![view.file("src/main.c")]);
        assert_eq!(
            group(&reconciler, GroupKind::Hijacked),
            vec![view.file("include/util.h"), view.file("src/util.c")]
        );
        // `.keep` files are filtered out by default
        assert_eq!(group(&reconciler, GroupKind::ViewPrivate), vec![view.file("notes.txt")]);

        let context = host.contexts.lock().unwrap().last().cloned().unwrap();
        assert_eq!(context.counts.hijacked, 2);
        assert!(host.last_render(GroupKind::ViewPrivate).is_some());
        Ok(())
    }

    #[tokio::test]
    async fn test_hidden_groups_are_cleared_not_scanned() -> anyhow::Result<()> {
        let view = create_mixed_view()?;
        let settings = Settings {
            show_hijacked: false,
            show_view_private: false,
            ..view.settings()
        };
        let (_context, host, reconciler) = wire(&view, settings, RecordingHost::default());

        reconciler.refresh_all().await?;

        let log = view.argv_log();
        assert!(!log.iter().any(|l| l.starts_with("ls ")));
        assert_eq!(host.clears.lock().unwrap().len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_showing_group_again_rescans_it() -> anyhow::Result<()> {
        let view = create_mixed_view()?;
        let hidden = Settings {
            show_hijacked: false,
            ..view.settings()
        };
        let (context, _host, reconciler) = wire(&view, hidden, RecordingHost::default());
        reconciler.refresh_all().await?;
        assert!(group(&reconciler, GroupKind::Hijacked).is_empty());

        context.config.apply(view.settings());
        reconciler.handle_configuration_changed().await;

        assert_eq!(group(&reconciler, GroupKind::Hijacked).len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_version_query_parses_checkedout() -> anyhow::Result<()> {
        let view = create_single_file_view()?;
        let file = view.file("f.txt");
        let (context, _host, _reconciler) = wire(&view, view.settings(), RecordingHost::default());

        let before = context.cleartool.version_info(&file).await?;
        assert_eq!(before.state(), Some(VersionState::Versioned));
        assert_eq!(before.label(), "/main/1");

        view.add_checkout(&file)?;
        let after = context.cleartool.version_info(&file).await?;
        assert!(after.is_checked_out());
        Ok(())
    }

    #[tokio::test]
    async fn test_will_save_read_only_checks_out_after_confirmation() -> anyhow::Result<()> {
        let view = create_single_file_view()?;
        let file = view.file("f.txt");
        let settings = Settings {
            confirm_checkout_on_save: true,
            ..view.settings()
        };
        let (_context, _host, reconciler) = wire(&view, settings, RecordingHost::answering(true, None));

        let outcome = reconciler.handle_will_save(&file, true).await?;

        assert_eq!(outcome, SaveOutcome::CheckedOut);
        assert_eq!(view.checkouts(), vec![file.to_string_lossy().into_owned()]);
        Ok(())
    }

    #[tokio::test]
    async fn test_missing_executable_degrades_file_events() -> anyhow::Result<()> {
        let view = create_single_file_view()?;
        let settings = Settings {
            executable: "/nonexistent/bin/cleartool".to_string(),
            ..view.settings()
        };
        let (_context, _host, reconciler) = wire(&view, settings, RecordingHost::default());

        let refresh = reconciler.refresh_all().await;
        assert!(matches!(refresh, Err(ClearCaseError::ExecutableNotFound { .. })));

        // Version query failures are swallowed and the groups stay untouched
        assert!(reconciler.handle_file_changed(&view.file("f.txt")).await);
        assert_eq!(reconciler.groups().counts(), Default::default());
        Ok(())
    }

    #[tokio::test]
    async fn test_tool_error_surfaces_for_user_operations() -> anyhow::Result<()> {
        let view = create_single_file_view()?;
        let (context, _host, _reconciler) = wire(&view, view.settings(), RecordingHost::default());

        // Unknown to the fake cleartool: exit 1 with a message on stderr
        let request = CommandRequest::new("mkelem", vec!["mkelem".to_string()], view.path());
        let result = context
            .cleartool
            .runner()
            .run(request, FailurePolicy::ActiveSession)
            .await;
        assert!(matches!(result, Err(ClearCaseError::ToolInvocation { exit_code: Some(1), .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_fetch_version_reuses_temp_copy() -> anyhow::Result<()> {
        let view = create_single_file_view()?;
        let file = view.file("f.txt");
        let (context, _host, _reconciler) = wire(&view, view.settings(), RecordingHost::default());

        let fetched = context.cleartool.fetch_version(&file, "/main/1").await?;
        assert!(fetched.starts_with(&view.tmp));
        assert!(fetched.to_string_lossy().ends_with("_f.txt"));
        let content = std::fs::read_to_string(&fetched)?;
        assert!(content.contains("f.txt@@/main/1"));

        let again = context.cleartool.fetch_version(&file, "/main/1").await?;
        assert_eq!(again, fetched);
        let gets = view.argv_log().iter().filter(|l| l.starts_with("get ")).count();
        assert_eq!(gets, 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_fetch_version_requires_configured_temp_dir() -> anyhow::Result<()> {
        let view = create_single_file_view()?;
        let settings = Settings {
            temp_dir: Some(view.tmp.join("missing")),
            ..view.settings()
        };
        let (context, _host, _reconciler) = wire(&view, settings, RecordingHost::default());

        let result = context.cleartool.fetch_version(&view.file("f.txt"), "/main/1").await;
        assert!(matches!(result, Err(ClearCaseError::TempDirectoryMissing { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_annotate_streams_non_blank_lines() -> anyhow::Result<()> {
        let view = create_single_file_view()?;
        let (context, _host, _reconciler) = wire(&view, view.settings(), RecordingHost::default());

        let mut handle = context.cleartool.annotate(&view.file("f.txt")).await?;
        let mut lines = Vec::new();
        while let Some(line) = handle.lines().next_line().await {
            lines.push(line);
        }
        assert_eq!(lines, vec!["line one", "line two", "line three"]);
        Ok(())
    }

    #[tokio::test]
    async fn test_diff_exit_one_means_differences() -> anyhow::Result<()> {
        let view = create_single_file_view()?;
        let (context, _host, _reconciler) = wire(&view, view.settings(), RecordingHost::default());

        let diff = context.cleartool.diff_with_predecessor(&view.file("f.txt")).await?;
        assert!(diff.contains("> added line"));
        assert_eq!(
            context.cleartool.predecessor(&view.file("f.txt")).await?,
            Some("/main/1".to_string())
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_dispose_kills_hung_scan_and_refuses_new_work() -> anyhow::Result<()> {
        let view = create_single_file_view()?;
        view.hang_scans()?;
        let (context, _host, reconciler) = wire(&view, view.settings(), RecordingHost::default());
        let reconciler = Arc::new(reconciler);

        let refresh = tokio::spawn({
            let reconciler = reconciler.clone();
            async move { reconciler.refresh_all().await }
        });
        let deadline = Instant::now() + Duration::from_secs(5);
        while !context.registry.is_running("find-checkouts") {
            assert!(Instant::now() < deadline, "checkout scan never started");
            tokio::time::sleep(Duration::from_millis(20)).await;
        }

        reconciler.dispose();
        let finished = tokio::time::timeout(Duration::from_secs(3), refresh).await??;
        // The killed scan counts as superseded and leaves the group alone
        assert!(finished.is_ok());
        assert_eq!(context.registry.running_count(), 0);

        let late = reconciler.checkout(&view.file("f.txt")).await;
        assert!(matches!(late, Err(ClearCaseError::Cancelled)));
        assert!(view.checkouts().is_empty());
        Ok(())
    }
}
