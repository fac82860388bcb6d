//! The orchestrating session for one active case.
//!
//! Collaborator calls are single-flight per [`Intent`]: a second request for
//! the same intent while one is outstanding fails fast with
//! [`SessionError::Busy`]. The case lock is never held across an await, so
//! metadata edits, communication logging, and timeline rendering stay
//! available while a call is outstanding. Collaborator results are applied
//! in one mutation once the call returns; a failed call changes nothing.

use std::collections::HashSet;
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use habicase_ai::{Analysis, AnalysisRequest, Classifier, ImageInput, Report, ReportGenerator};
use habicase_core::model::new_id;
use habicase_core::{
    Case, CaseStore, Communication, EvidenceItem, Issue, LayoutConfig, MetadataUpdate,
    TimelineLayout, timeline,
};
use habicase_store::{SnapshotStore, load_case, save_case};
use tracing::{info, warn};

use crate::SessionError;

/// A kind of collaborator request that may be outstanding at most once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Intent {
    AnalyzeIssue,
    AnalyzeEvidence,
    GenerateReport,
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::AnalyzeIssue => "issue analysis",
            Self::AnalyzeEvidence => "evidence analysis",
            Self::GenerateReport => "report generation",
        })
    }
}

/// Releases its intent when dropped, whether the call succeeded or not.
struct InFlight<'a> {
    set: &'a Mutex<HashSet<Intent>>,
    intent: Intent,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        lock(self.set).remove(&self.intent);
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// What an analyzed intake added to the case.
#[derive(Debug, Clone)]
pub struct IssueIntake {
    pub issue: Issue,
    pub evidence: Option<EvidenceItem>,
    pub disclaimers: Vec<String>,
    pub summary: Option<String>,
}

/// The active case plus its persistence handle.
pub struct CaseSession<P> {
    store: Mutex<CaseStore>,
    persistence: P,
    in_flight: Mutex<HashSet<Intent>>,
    last_report: Mutex<Option<Report>>,
}

impl<P: SnapshotStore> CaseSession<P> {
    /// Restore the saved case, or start from the empty case if there is
    /// none (or it cannot be read).
    pub fn open(persistence: P) -> Self {
        let case = load_case(&persistence).unwrap_or_default();
        Self {
            store: Mutex::new(CaseStore::with_case(case)),
            persistence,
            in_flight: Mutex::new(HashSet::new()),
            last_report: Mutex::new(None),
        }
    }

    /// Persist the current case. A case without an id gets one first.
    pub fn save(&self) -> Result<(), SessionError> {
        let case = {
            let mut store = lock(&self.store);
            if store.case().metadata.id.is_empty() {
                let id = new_id("case");
                info!(case_id = %id, "assigning case id");
                store.update_metadata(MetadataUpdate::Id(id));
            }
            store.snapshot()
        };
        save_case(&self.persistence, &case)?;
        Ok(())
    }

    /// Owned copy of the current case.
    pub fn case(&self) -> Case {
        lock(&self.store).snapshot()
    }

    pub fn update_metadata(&self, update: MetadataUpdate) {
        lock(&self.store).update_metadata(update);
    }

    pub fn update_metadata_all(&self, updates: impl IntoIterator<Item = MetadataUpdate>) {
        lock(&self.store).update_metadata_all(updates);
    }

    pub fn add_issue(&self, issue: Issue) {
        lock(&self.store).add_issue(issue);
    }

    pub fn log_communication(&self, comm: Communication) {
        lock(&self.store).add_communication(comm);
    }

    pub fn load_case(&self, case: Case) {
        lock(&self.store).load_case(case);
    }

    /// Replace the case from snapshot JSON. A blob that does not decode
    /// leaves the current case untouched.
    pub fn import_snapshot(&self, snapshot: &str) -> Result<(), SessionError> {
        let case = Case::from_snapshot(snapshot)?;
        self.load_case(case);
        Ok(())
    }

    pub fn export_snapshot(&self) -> Result<String, SessionError> {
        Ok(lock(&self.store).to_snapshot()?)
    }

    pub fn reset(&self) {
        lock(&self.store).reset();
        *lock(&self.last_report) = None;
    }

    /// Lay out the current issues and communications against `now`.
    pub fn timeline(&self, now: DateTime<Utc>, config: &LayoutConfig) -> TimelineLayout {
        let store = lock(&self.store);
        let case = store.case();
        timeline::layout(&case.issues, &case.communications, now, config)
    }

    /// The most recent successfully generated report.
    pub fn last_report(&self) -> Option<Report> {
        lock(&self.last_report).clone()
    }

    fn begin(&self, intent: Intent) -> Result<InFlight<'_>, SessionError> {
        let mut set = lock(&self.in_flight);
        if !set.insert(intent) {
            warn!(%intent, "rejecting duplicate request");
            return Err(SessionError::Busy(intent));
        }
        Ok(InFlight {
            set: &self.in_flight,
            intent,
        })
    }

    /// Classify a free-text description (and optional photo) into a new
    /// issue. Missing fields fall back to defaults; with a photo, an
    /// evidence item carrying the suggested caption is attached as well.
    pub async fn analyze_issue(
        &self,
        classifier: &dyn Classifier,
        request: AnalysisRequest,
        now: DateTime<Utc>,
    ) -> Result<IssueIntake, SessionError> {
        let _guard = self.begin(Intent::AnalyzeIssue)?;
        let analysis = classifier.analyze(&request).await?;

        let Analysis {
            issue: draft,
            disclaimers,
            summary,
            ..
        } = analysis.clone();
        let today = now.format("%Y-%m-%d").to_string();
        let issue = draft
            .unwrap_or_default()
            .resolve(new_id("issue"), &request.description, &today);
        let evidence = request.image.as_ref().map(|image| {
            evidence_item(
                &issue.id,
                image,
                analysis.first_caption().unwrap_or_default(),
                "",
                now,
            )
        });

        {
            let mut store = lock(&self.store);
            store.add_issue(issue.clone());
            if let Some(item) = &evidence {
                store.add_evidence(item.clone());
            }
        }

        Ok(IssueIntake {
            issue,
            evidence,
            disclaimers,
            summary,
        })
    }

    /// Attach a photo to an existing issue. With a classifier, the photo is
    /// captioned first; without one, only the user's caption is kept.
    pub async fn attach_evidence(
        &self,
        classifier: Option<&dyn Classifier>,
        issue_id: &str,
        image: ImageInput,
        user_caption: &str,
        now: DateTime<Utc>,
    ) -> Result<EvidenceItem, SessionError> {
        let title = lock(&self.store)
            .case()
            .issue(issue_id)
            .map(|i| i.title.clone())
            .ok_or_else(|| SessionError::UnknownIssue(issue_id.to_string()))?;

        let ai_caption = match classifier {
            Some(classifier) => {
                let _guard = self.begin(Intent::AnalyzeEvidence)?;
                let request = AnalysisRequest::text(format!("Photo of the issue: {title}"))
                    .with_image(image.clone());
                let analysis = classifier.analyze(&request).await?;
                analysis.first_caption().unwrap_or_default().to_string()
            }
            None => String::new(),
        };

        // The case may have been reset or replaced while the call was out.
        let mut store = lock(&self.store);
        if store.case().issue(issue_id).is_none() {
            warn!(issue_id, "issue gone before evidence could be attached");
            return Err(SessionError::UnknownIssue(issue_id.to_string()));
        }
        let item = evidence_item(issue_id, &image, &ai_caption, user_caption, now);
        store.add_evidence(item.clone());
        Ok(item)
    }

    /// Generate a report for the current case. On failure the previous
    /// report, if any, is kept.
    pub async fn generate_report(
        &self,
        generator: &dyn ReportGenerator,
    ) -> Result<Report, SessionError> {
        let _guard = self.begin(Intent::GenerateReport)?;
        let case = self.case();
        let report = generator.generate(&case).await?;
        *lock(&self.last_report) = Some(report.clone());
        Ok(report)
    }
}

fn evidence_item(
    issue_id: &str,
    image: &ImageInput,
    ai_caption: &str,
    user_caption: &str,
    now: DateTime<Utc>,
) -> EvidenceItem {
    let stamp = now.to_rfc3339();
    EvidenceItem {
        id: new_id("evidence"),
        issue_id: issue_id.to_string(),
        file_reference: image.to_data_uri(),
        captured_at: stamp.clone(),
        uploaded_at: stamp,
        ai_caption: ai_caption.to_string(),
        user_caption: user_caption.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use chrono::TimeZone;
    use habicase_ai::{AiError, EvidenceDraft};
    use habicase_core::{ContactField, IssueDraft, IssueStatus, Severity};
    use habicase_store::MemoryStore;
    use tokio::sync::Notify;

    use super::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    /// Returns a fixed analysis, or fails. When gated, it signals `started`
    /// and then waits for `release` before answering.
    #[derive(Default)]
    struct FakeClassifier {
        analysis: Analysis,
        fail: bool,
        gate: Option<(Arc<Notify>, Arc<Notify>)>,
    }

    #[async_trait]
    impl Classifier for FakeClassifier {
        async fn analyze(&self, _request: &AnalysisRequest) -> Result<Analysis, AiError> {
            if let Some((started, release)) = &self.gate {
                started.notify_one();
                release.notified().await;
            }
            if self.fail {
                return Err(AiError::Server {
                    status: 503,
                    body: "unavailable".into(),
                });
            }
            Ok(self.analysis.clone())
        }
    }

    struct FakeReporter {
        body: Option<&'static str>,
    }

    #[async_trait]
    impl ReportGenerator for FakeReporter {
        async fn generate(&self, case: &Case) -> Result<Report, AiError> {
            match self.body {
                Some(body) => Ok(Report {
                    report_body: format!("{body} ({} issues)", case.issues.len()),
                    ..Default::default()
                }),
                None => Err(AiError::EmptyResponse),
            }
        }
    }

    fn session() -> CaseSession<MemoryStore> {
        CaseSession::open(MemoryStore::new())
    }

    fn image() -> ImageInput {
        ImageInput::new("image/jpeg", "/9j/4AAQ")
    }

    #[tokio::test]
    async fn empty_analysis_fills_defaults() {
        let session = session();
        let intake = session
            .analyze_issue(
                &FakeClassifier::default(),
                AnalysisRequest::text("ceiling mold"),
                now(),
            )
            .await
            .unwrap();

        let issue = &intake.issue;
        assert_eq!(issue.title, "New Issue");
        assert_eq!(issue.category, "General");
        assert_eq!(issue.room, "Unknown");
        assert_eq!(issue.severity, Severity::Medium);
        assert_eq!(issue.status, IssueStatus::Ongoing);
        assert_eq!(issue.first_noticed_at, "2024-03-01");
        assert_eq!(issue.description, "ceiling mold");
        assert!(intake.evidence.is_none());
        assert_eq!(session.case().issues, vec![issue.clone()]);
        assert!(session.case().evidence.is_empty());
    }

    #[tokio::test]
    async fn analysis_with_image_attaches_captioned_evidence() {
        let classifier = FakeClassifier {
            analysis: Analysis {
                issue: Some(IssueDraft {
                    title: Some("Mold above shower".into()),
                    severity: Some("high".into()),
                    ..Default::default()
                }),
                evidence_items: vec![EvidenceDraft {
                    caption: "Dark patch on ceiling".into(),
                }],
                ..Default::default()
            },
            ..Default::default()
        };
        let session = session();
        let intake = session
            .analyze_issue(
                &classifier,
                AnalysisRequest::text("mold").with_image(image()),
                now(),
            )
            .await
            .unwrap();

        let case = session.case();
        assert_eq!(case.issues.len(), 1);
        assert_eq!(case.evidence.len(), 1);
        let item = &case.evidence[0];
        assert_eq!(item.issue_id, intake.issue.id);
        assert_eq!(item.ai_caption, "Dark patch on ceiling");
        assert_eq!(item.file_reference, "data:image/jpeg;base64,/9j/4AAQ");
        assert_eq!(intake.issue.severity, Severity::High);
    }

    #[tokio::test]
    async fn failed_analysis_leaves_case_untouched() {
        let session = session();
        let classifier = FakeClassifier {
            fail: true,
            ..Default::default()
        };
        let err = session
            .analyze_issue(&classifier, AnalysisRequest::text("leak"), now())
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::Collaborator(_)));
        assert!(session.case().is_empty());

        // The intent is released after a failure.
        session
            .analyze_issue(&FakeClassifier::default(), AnalysisRequest::text("leak"), now())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn duplicate_request_is_busy_while_unrelated_actions_proceed() {
        let started = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        let classifier = FakeClassifier {
            gate: Some((started.clone(), release.clone())),
            ..Default::default()
        };
        let session = session();

        let first = session.analyze_issue(&classifier, AnalysisRequest::text("leak"), now());
        let second = async {
            started.notified().await;
            let dup = session
                .analyze_issue(&classifier, AnalysisRequest::text("leak again"), now())
                .await;
            session.update_metadata(MetadataUpdate::Contact {
                field: ContactField::Name,
                value: "Dana".into(),
            });
            let layout = session.timeline(now(), &LayoutConfig::default());
            release.notify_one();
            (dup, layout)
        };

        let (first, (dup, layout)) = tokio::join!(first, second);
        assert!(first.is_ok());
        assert!(matches!(dup, Err(SessionError::Busy(Intent::AnalyzeIssue))));
        assert!(matches!(layout, TimelineLayout::Empty { .. }));

        let case = session.case();
        assert_eq!(case.issues.len(), 1);
        assert_eq!(case.metadata.landlord_contact.name, "Dana");
    }

    #[tokio::test]
    async fn attach_evidence_rejects_unknown_issue() {
        let session = session();
        let err = session
            .attach_evidence(None, "missing", image(), "", now())
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::UnknownIssue(id) if id == "missing"));
        assert!(session.case().evidence.is_empty());
    }

    #[tokio::test]
    async fn attach_evidence_with_and_without_classifier() {
        let session = session();
        let intake = session
            .analyze_issue(&FakeClassifier::default(), AnalysisRequest::text("no heat"), now())
            .await
            .unwrap();
        let id = intake.issue.id;

        let plain = session
            .attach_evidence(None, &id, image(), "thermostat", now())
            .await
            .unwrap();
        assert_eq!(plain.user_caption, "thermostat");
        assert_eq!(plain.ai_caption, "");

        let classifier = FakeClassifier {
            analysis: Analysis {
                evidence_items: vec![EvidenceDraft {
                    caption: "Thermostat reads 55F".into(),
                }],
                ..Default::default()
            },
            ..Default::default()
        };
        let captioned = session
            .attach_evidence(Some(&classifier), &id, image(), "", now())
            .await
            .unwrap();
        assert_eq!(captioned.display_caption(), "Thermostat reads 55F");
        assert_eq!(session.case().evidence_for(&id).count(), 2);
    }

    #[tokio::test]
    async fn evidence_for_issue_removed_mid_call_is_rejected() {
        let session = session();
        let intake = session
            .analyze_issue(&FakeClassifier::default(), AnalysisRequest::text("leak"), now())
            .await
            .unwrap();
        let id = intake.issue.id;

        let started = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        let classifier = FakeClassifier {
            analysis: Analysis {
                evidence_items: vec![EvidenceDraft {
                    caption: "Water under sink".into(),
                }],
                ..Default::default()
            },
            gate: Some((started.clone(), release.clone())),
            ..Default::default()
        };

        let attach = session.attach_evidence(Some(&classifier), &id, image(), "", now());
        let interfere = async {
            started.notified().await;
            session.reset();
            release.notify_one();
        };
        let (result, ()) = tokio::join!(attach, interfere);

        assert!(matches!(result, Err(SessionError::UnknownIssue(ref gone)) if *gone == id));
        let case = session.case();
        assert!(case.issues.is_empty());
        assert!(case.evidence.is_empty());
    }

    #[tokio::test]
    async fn failed_report_keeps_previous() {
        let session = session();
        let first = session
            .generate_report(&FakeReporter { body: Some("Report") })
            .await
            .unwrap();
        assert_eq!(first.report_body, "Report (0 issues)");

        let err = session
            .generate_report(&FakeReporter { body: None })
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::Collaborator(AiError::EmptyResponse)));
        assert_eq!(session.last_report(), Some(first));
    }

    #[test]
    fn save_assigns_id_and_reopen_restores() {
        let store = MemoryStore::new();
        {
            let session = CaseSession::open(&store);
            session.update_metadata(MetadataUpdate::PropertyAddress("12 Elm St".into()));
            session.save().unwrap();
            assert!(session.case().metadata.id.starts_with("case-"));
        }
        let reopened = CaseSession::open(&store);
        let case = reopened.case();
        assert_eq!(case.metadata.property_address, "12 Elm St");
        assert!(!case.metadata.id.is_empty());
    }

    #[test]
    fn corrupt_snapshot_opens_empty() {
        let store = MemoryStore::with_blob(habicase_store::SNAPSHOT_KEY, "{not json");
        let session = CaseSession::open(store);
        assert!(session.case().is_empty());
    }

    #[test]
    fn bad_import_keeps_current_case() {
        let session = session();
        session.update_metadata(MetadataUpdate::PropertyAddress("1 Main".into()));
        let err = session.import_snapshot("{\"issues\": 7}").unwrap_err();
        assert!(matches!(err, SessionError::Snapshot(_)));
        assert_eq!(session.case().metadata.property_address, "1 Main");

        let json = session.export_snapshot().unwrap();
        session.reset();
        assert!(session.case().is_empty());
        session.import_snapshot(&json).unwrap();
        assert_eq!(session.case().metadata.property_address, "1 Main");
    }
}
