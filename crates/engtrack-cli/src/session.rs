//! Interactive menu: add, modify/delete, view, query, exit.
//!
//! Each menu action loads a fresh snapshot from the store and, if it
//! changes anything, writes the whole document back.

use std::io::{BufRead, Write};
use std::path::PathBuf;

use anyhow::Result;
use chrono::{Local, NaiveDate};

use engtrack_core::engagement::rating_in_range;
use engtrack_core::{
    parse_rating, Document, Engagement, EngagementStore, FeedbackAnswer, MetricsEngine,
    ENGAGEMENT_TYPE_PRESETS, FEEDBACK_QUESTIONS,
};

use crate::console::Console;
use crate::report::{print_engagement, print_ratings, print_report, write_csv};

const MAIN_MENU: &str = "\
Engagement Tracker
  1. Add engagement
  2. Modify or delete engagement
  3. View engagements
  4. Query metrics
  5. Exit";

const EDITABLE_FIELDS: [&str; 13] = [
    "Client name",
    "Engagement types",
    "Domain admin obtained",
    "Number of users",
    "Number of live hosts",
    "Compromised users",
    "Sensitive data obtained",
    "Client feedback",
    "Client rating",
    "Projected hours",
    "Hours spent",
    "Start date",
    "End date",
];

/// A single-field change applied to every record of the selected client.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldEdit {
    ClientName(String),
    EngagementTypes(Vec<String>),
    DomainAdmin(bool),
    Users(u32),
    LiveHosts(u32),
    Compromised(u32),
    SensitiveData(bool),
    Feedback(Vec<FeedbackAnswer>),
    Rating(f64),
    ProjectedHours(i64),
    HoursSpent(i64),
    StartDate(NaiveDate),
    EndDate(NaiveDate),
}

impl FieldEdit {
    pub fn apply(&self, e: &mut Engagement) {
        match self {
            Self::ClientName(name) => e.client_name = name.clone(),
            Self::EngagementTypes(types) => e.engagement_type = types.clone(),
            Self::DomainAdmin(b) => e.domain_admin_obtained = *b,
            Self::Users(n) => e.number_of_users = *n,
            Self::LiveHosts(n) => e.number_of_live_hosts = *n,
            Self::Compromised(n) => e.compromised_users_count = *n,
            Self::SensitiveData(b) => e.sensitive_data_obtained = *b,
            Self::Feedback(answers) => e.client_feedback_questions = answers.clone(),
            Self::Rating(r) => e.client_rating = Some(*r),
            Self::ProjectedHours(h) => e.set_projected_hours(*h),
            Self::HoursSpent(h) => e.set_hours_spent(*h),
            Self::StartDate(d) => e.set_start_date(*d),
            Self::EndDate(d) => e.set_end_date(*d),
        }
    }
}

/// Turn a comma-separated list of preset numbers plus free-form custom tags
/// into engagement types. Returns the types and any unusable selections.
pub fn parse_type_selection(selection: &str, custom: &str) -> (Vec<String>, Vec<String>) {
    let mut types = Vec::new();
    let mut rejected = Vec::new();
    for token in selection.split(',').map(str::trim).filter(|t| !t.is_empty()) {
        match token
            .parse::<usize>()
            .ok()
            .and_then(|n| n.checked_sub(1))
            .and_then(|i| ENGAGEMENT_TYPE_PRESETS.get(i))
        {
            Some(preset) => types.push((*preset).to_string()),
            None => rejected.push(token.to_string()),
        }
    }
    types.extend(
        custom
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(String::from),
    );
    (types, rejected)
}

pub struct Session<'a, S, R, W> {
    store: &'a S,
    engine: MetricsEngine,
    csv_path: PathBuf,
    console: Console<R, W>,
}

impl<'a, S, R, W> Session<'a, S, R, W>
where
    S: EngagementStore,
    R: BufRead,
    W: Write,
{
    pub fn new(
        store: &'a S,
        engine: MetricsEngine,
        csv_path: PathBuf,
        console: Console<R, W>,
    ) -> Self {
        Self {
            store,
            engine,
            csv_path,
            console,
        }
    }

    /// Loop over the main menu until Exit or end of input.
    pub fn run(&mut self) -> Result<()> {
        loop {
            self.console.say("")?;
            self.console.say(MAIN_MENU)?;
            let Some(choice) = self.console.ask("Select an option: ")? else {
                return Ok(());
            };
            let outcome = match choice.as_str() {
                "1" => self.add_engagement(),
                "2" => self.modify_or_delete(),
                "3" => self.view(),
                "4" => self.query(),
                "5" => {
                    self.console.say("Goodbye.")?;
                    return Ok(());
                }
                other => self
                    .console
                    .say(format!("Invalid choice {other:?}, enter a number from 1 to 5.")),
            };
            if let Err(e) = outcome {
                self.console.say(format!("Error: {e:#}"))?;
            }
        }
    }

    fn load(&mut self) -> Result<Document> {
        let document = self.store.load()?;
        if let Some((stored, actual)) = document.count_mismatch() {
            self.console.say(format!(
                "Warning: metadata.totalRecords is {stored} but {actual} engagements are present."
            ))?;
        }
        Ok(document)
    }

    fn cancelled(&mut self) -> Result<()> {
        self.console.say("Operation cancelled.")
    }

    // -----------------------------------------------------------------------
    // Add
    // -----------------------------------------------------------------------

    fn add_engagement(&mut self) -> Result<()> {
        let document = self.load()?;

        let Some(client_name) = self.console.ask("Client name: ")? else {
            return self.cancelled();
        };
        if client_name.is_empty() {
            self.console.say("Client name is required.")?;
            return Ok(());
        }
        let mut e = Engagement::new(client_name, Local::now().date_naive());

        let Some(types) = self.read_types()? else {
            return self.cancelled();
        };
        e.engagement_type = types;

        let Some(domain_admin) = self.console.ask_yes_no("Domain admin obtained? (y/n): ")? else {
            return self.cancelled();
        };
        e.domain_admin_obtained = domain_admin;

        let Some(users) = self
            .console
            .ask_parsed::<u32>("Number of users: ", "number of users")?
        else {
            return self.cancelled();
        };
        e.number_of_users = users;
        let Some(hosts) = self
            .console
            .ask_parsed::<u32>("Number of live hosts: ", "number of live hosts")?
        else {
            return self.cancelled();
        };
        e.number_of_live_hosts = hosts;
        let Some(compromised) = self
            .console
            .ask_parsed::<u32>("Compromised users: ", "compromised user count")?
        else {
            return self.cancelled();
        };
        e.compromised_users_count = compromised;

        let Some(sensitive) = self.console.ask_yes_no("Sensitive data obtained? (y/n): ")? else {
            return self.cancelled();
        };
        e.sensitive_data_obtained = sensitive;

        let Some(feedback) = self.read_feedback()? else {
            return self.cancelled();
        };
        e.client_feedback_questions = feedback;

        let Some(rating) = self.read_rating()? else {
            return self.cancelled();
        };
        e.client_rating = Some(rating);

        let Some(projected) = self.read_hours("Projected hours: ")? else {
            return self.cancelled();
        };
        let Some(spent) = self.read_hours("Hours spent: ")? else {
            return self.cancelled();
        };
        e.set_hours(projected, spent);

        let Some(start) = self.console.validate_date("Start date (MM/DD/YYYY): ")? else {
            return self.cancelled();
        };
        let Some(end) = self.console.validate_date("End date (MM/DD/YYYY): ")? else {
            return self.cancelled();
        };
        if end < start {
            self.console
                .say("End date is before start date; business days will be 0.")?;
        }
        e.set_dates(start, end);

        let name = e.client_name.clone();
        let document = document.with_added(e);
        self.store.save(&document)?;
        self.console.say(format!(
            "Added engagement for {name} ({} total).",
            document.metadata.total_records
        ))
    }

    fn read_types(&mut self) -> Result<Option<Vec<String>>> {
        self.console.say("Engagement types:")?;
        for (i, preset) in ENGAGEMENT_TYPE_PRESETS.iter().enumerate() {
            self.console.say(format!("  {}. {preset}", i + 1))?;
        }
        let Some(selection) = self
            .console
            .ask("Select types (comma-separated numbers, blank for none): ")?
        else {
            return Ok(None);
        };
        let Some(custom) = self
            .console
            .ask("Custom types (comma-separated, blank for none): ")?
        else {
            return Ok(None);
        };
        let (types, rejected) = parse_type_selection(&selection, &custom);
        for r in &rejected {
            self.console.say(format!("Ignoring invalid selection {r:?}."))?;
        }
        Ok(Some(types))
    }

    fn read_feedback(&mut self) -> Result<Option<Vec<FeedbackAnswer>>> {
        self.console.say("Client feedback:")?;
        let mut answers = Vec::with_capacity(FEEDBACK_QUESTIONS.len());
        for question in FEEDBACK_QUESTIONS {
            let Some(answer) = self.console.ask(&format!("{question} "))? else {
                return Ok(None);
            };
            answers.push(FeedbackAnswer::new(question, answer));
        }
        Ok(Some(answers))
    }

    /// Invalid or out-of-range ratings fall back to 0 with a warning rather
    /// than re-prompting.
    fn read_rating(&mut self) -> Result<Option<f64>> {
        let Some(answer) = self.console.ask("Client rating (0-5): ")? else {
            return Ok(None);
        };
        let rating = match parse_rating(&answer) {
            Ok(r) if rating_in_range(r) => r,
            Ok(r) => {
                self.console
                    .say(format!("Rating {r} is outside 0-5, defaulting to 0."))?;
                0.0
            }
            Err(_) => {
                self.console
                    .say(format!("Invalid rating {answer:?}, defaulting to 0."))?;
                0.0
            }
        };
        Ok(Some(rating))
    }

    fn read_hours(&mut self, prompt: &str) -> Result<Option<i64>> {
        Ok(self
            .console
            .ask_parsed::<u32>(prompt, "hour count")?
            .map(i64::from))
    }

    // -----------------------------------------------------------------------
    // Modify / delete
    // -----------------------------------------------------------------------

    fn modify_or_delete(&mut self) -> Result<()> {
        let document = self.load()?;
        if document.is_empty() {
            return self.console.say("No engagements recorded yet.");
        }
        let Some(client) = self
            .console
            .select_client(&document.engagements, "Client: ")?
        else {
            return self.cancelled();
        };
        let count = document.find_client(&client).len();
        self.console
            .say(format!("Selected {client} ({count} record(s))."))?;
        self.console.say("  1. Modify\n  2. Delete")?;
        let Some(action) = self.console.ask("Action: ")? else {
            return self.cancelled();
        };

        match action.as_str() {
            "1" => self.modify_client(document, &client),
            "2" => self.delete_client(document, &client, count),
            other => self
                .console
                .say(format!("Invalid choice {other:?}, enter 1 or 2.")),
        }
    }

    fn modify_client(&mut self, document: Document, client: &str) -> Result<()> {
        for (i, field) in EDITABLE_FIELDS.iter().enumerate() {
            self.console.say(format!("  {:>2}. {field}", i + 1))?;
        }
        let Some(index) = self
            .console
            .ask_parsed::<usize>("Field to modify: ", "field number")?
        else {
            return self.cancelled();
        };
        let Some(edit) = self.read_edit(index)? else {
            return self.cancelled();
        };

        let (document, touched) = document.with_client_updated(client, |e| edit.apply(e));
        self.store.save(&document)?;
        self.console
            .say(format!("Updated {touched} record(s) for {client}."))
    }

    fn read_edit(&mut self, index: usize) -> Result<Option<FieldEdit>> {
        let edit = match index {
            1 => match self.console.ask("New client name: ")? {
                Some(name) if !name.is_empty() => Some(FieldEdit::ClientName(name)),
                Some(_) => {
                    self.console.say("Client name is required.")?;
                    None
                }
                None => None,
            },
            2 => self.read_types()?.map(FieldEdit::EngagementTypes),
            3 => self
                .console
                .ask_yes_no("Domain admin obtained? (y/n): ")?
                .map(FieldEdit::DomainAdmin),
            4 => self
                .console
                .ask_parsed("Number of users: ", "number of users")?
                .map(FieldEdit::Users),
            5 => self
                .console
                .ask_parsed("Number of live hosts: ", "number of live hosts")?
                .map(FieldEdit::LiveHosts),
            6 => self
                .console
                .ask_parsed("Compromised users: ", "compromised user count")?
                .map(FieldEdit::Compromised),
            7 => self
                .console
                .ask_yes_no("Sensitive data obtained? (y/n): ")?
                .map(FieldEdit::SensitiveData),
            8 => self.read_feedback()?.map(FieldEdit::Feedback),
            9 => self.read_rating()?.map(FieldEdit::Rating),
            10 => self
                .read_hours("Projected hours: ")?
                .map(FieldEdit::ProjectedHours),
            11 => self.read_hours("Hours spent: ")?.map(FieldEdit::HoursSpent),
            12 => self
                .console
                .validate_date("Start date (MM/DD/YYYY): ")?
                .map(FieldEdit::StartDate),
            13 => self
                .console
                .validate_date("End date (MM/DD/YYYY): ")?
                .map(FieldEdit::EndDate),
            other => {
                self.console.say(format!(
                    "Invalid field {other}, enter a number from 1 to {}.",
                    EDITABLE_FIELDS.len()
                ))?;
                None
            }
        };
        Ok(edit)
    }

    fn delete_client(&mut self, document: Document, client: &str, count: usize) -> Result<()> {
        let confirmed = self
            .console
            .ask_yes_no(&format!("Delete all {count} record(s) for {client}? (y/n): "))?;
        if confirmed != Some(true) {
            return self.cancelled();
        }
        let (document, removed) = document.without_client(client);
        self.store.save(&document)?;
        self.console.say(format!(
            "Deleted {removed} record(s) for {client}. {} engagement(s) remain.",
            document.metadata.total_records
        ))
    }

    // -----------------------------------------------------------------------
    // View / query
    // -----------------------------------------------------------------------

    fn view(&mut self) -> Result<()> {
        let document = self.load()?;
        if document.is_empty() {
            return self.console.say("No engagements recorded yet.");
        }
        self.console.say("  1. All engagements\n  2. One client")?;
        let Some(choice) = self.console.ask("View: ")? else {
            return self.cancelled();
        };
        match choice.as_str() {
            "1" => {
                let mut sorted: Vec<&Engagement> = document.engagements.iter().collect();
                sorted.sort_by(|a, b| a.client_name.cmp(&b.client_name));
                for e in sorted {
                    print_engagement(self.console.output(), e)?;
                }
                Ok(())
            }
            "2" => {
                let Some(client) = self
                    .console
                    .select_client(&document.engagements, "Client: ")?
                else {
                    return self.cancelled();
                };
                for e in document.find_client(&client) {
                    print_engagement(self.console.output(), e)?;
                }
                Ok(())
            }
            other => self
                .console
                .say(format!("Invalid choice {other:?}, enter 1 or 2.")),
        }
    }

    fn query(&mut self) -> Result<()> {
        let document = self.load()?;
        self.console.say(
            "  1. Complete metrics report\n  2. Average users / hosts / compromised\n  3. Client ratings",
        )?;
        let Some(choice) = self.console.ask("Report: ")? else {
            return self.cancelled();
        };
        match choice.as_str() {
            "1" => {
                let report = self.engine.complete_report(&document.engagements);
                print_report(self.console.output(), "Engagement Metrics", &report)?;
                write_csv(&self.csv_path, &report)?;
                self.console
                    .say(format!("Report written to {}.", self.csv_path.display()))
            }
            "2" => {
                let report = self.engine.averages_report(&document.engagements);
                print_report(self.console.output(), "Averages", &report)
            }
            "3" => {
                let lines = self.engine.ratings_listing(&document.engagements);
                print_ratings(self.console.output(), &lines)
            }
            other => self
                .console
                .say(format!("Invalid choice {other:?}, enter 1, 2 or 3.")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    use engtrack_core::MetricsOptions;
    use engtrack_store::JsonStore;
    use tempfile::TempDir;

    const ADD_ACME: &str = "1\nAcme\n1,3\nRed Team\ny\n100\n50\n10\nn\n\
                            Very\nClear\nYes\nMinimal\nLikely\n\
                            4.85\n40\n45\n03/04/2024\n03/10/2024\n";

    fn run_script(store: &JsonStore, csv: PathBuf, script: &str) -> String {
        let console = Console::new(Cursor::new(script.as_bytes().to_vec()), Vec::new());
        let mut session = Session::new(
            store,
            MetricsEngine::new(MetricsOptions::default()),
            csv,
            console,
        );
        session.run().unwrap();
        String::from_utf8(session.console.output().clone()).unwrap()
    }

    fn setup() -> (TempDir, JsonStore) {
        let dir = TempDir::new().unwrap();
        let store = JsonStore::new(dir.path().join("engagements.json"));
        (dir, store)
    }

    #[test]
    fn test_add_engagement_full_flow() {
        let (dir, store) = setup();
        let out = run_script(&store, dir.path().join("m.csv"), &format!("{ADD_ACME}5\n"));
        assert!(out.contains("Added engagement for Acme (1 total)."));

        let doc = store.load().unwrap();
        assert_eq!(doc.metadata.total_records, 1);
        let e = &doc.engagements[0];
        assert_eq!(
            e.engagement_type,
            vec!["Internal", "Web Application", "Red Team"]
        );
        assert!(e.domain_admin_obtained);
        assert_eq!(e.number_of_users, 100);
        assert_eq!(e.client_feedback_questions.len(), 5);
        assert_eq!(e.client_rating, Some(4.9));
        assert_eq!(e.hours_difference, Some(5));
        assert_eq!(e.start_date.as_deref(), Some("03/04/24"));
        assert_eq!(e.business_days_count, 5);
    }

    #[test]
    fn test_invalid_rating_defaults_to_zero() {
        let (dir, store) = setup();
        let script = ADD_ACME.replace("4.85\n", "excellent\n");
        let out = run_script(&store, dir.path().join("m.csv"), &format!("{script}5\n"));
        assert!(out.contains("defaulting to 0"));
        assert_eq!(store.load().unwrap().engagements[0].client_rating, Some(0.0));
    }

    #[test]
    fn test_non_numeric_count_abandons_add() {
        let (dir, store) = setup();
        let out = run_script(
            &store,
            dir.path().join("m.csv"),
            "1\nAcme\n1\n\ny\nlots\n5\n",
        );
        assert!(out.contains("Invalid number of users"));
        assert!(out.contains("Operation cancelled."));
        assert!(!store.path().exists());
    }

    #[test]
    fn test_modify_hours_recomputes_difference() {
        let (dir, store) = setup();
        run_script(&store, dir.path().join("m.csv"), &format!("{ADD_ACME}5\n"));

        let out = run_script(&store, dir.path().join("m.csv"), "2\nacme\n1\n11\n30\n5\n");
        assert!(out.contains("Updated 1 record(s) for Acme."));
        let e = &store.load().unwrap().engagements[0];
        assert_eq!(e.hours_spent, Some(30));
        assert_eq!(e.hours_difference, Some(-10));
    }

    #[test]
    fn test_delete_only_client() {
        let (dir, store) = setup();
        run_script(&store, dir.path().join("m.csv"), &format!("{ADD_ACME}5\n"));

        let out = run_script(&store, dir.path().join("m.csv"), "2\nAcme\n2\ny\n5\n");
        assert!(out.contains("Deleted 1 record(s) for Acme. 0 engagement(s) remain."));
        let doc = store.load().unwrap();
        assert_eq!(doc.metadata.total_records, 0);
        assert!(doc.engagements.is_empty());
    }

    #[test]
    fn test_query_writes_csv() {
        let (dir, store) = setup();
        let csv = dir.path().join("metrics_report.csv");
        run_script(&store, csv.clone(), &format!("{ADD_ACME}4\n1\n5\n"));
        let text = std::fs::read_to_string(&csv).unwrap();
        assert!(text.starts_with("Label,Value\n"));
        assert!(text.contains("Internal Engagements with Domain Admin,100.00% (1/1)"));
    }

    #[test]
    fn test_mismatch_warning_shown() {
        let (dir, store) = setup();
        std::fs::write(
            store.path(),
            r#"{"metadata": {"totalRecords": 3}, "engagements": [{"clientName": "A"}]}"#,
        )
        .unwrap();
        let out = run_script(&store, dir.path().join("m.csv"), "4\n3\n5\n");
        assert!(out.contains("totalRecords is 3 but 1 engagements are present"));
        assert!(out.contains("Client: A, Rating: N/A/5"));
    }

    #[test]
    fn test_invalid_menu_choice_and_eof() {
        let (dir, store) = setup();
        let out = run_script(&store, dir.path().join("m.csv"), "9\n");
        assert!(out.contains("Invalid choice \"9\""));
    }

    #[test]
    fn test_parse_type_selection() {
        let (types, rejected) = parse_type_selection("1, 8, 9, x", "Purple Team, ,Internal");
        assert_eq!(
            types,
            vec!["Internal", "Mobile Application", "Purple Team", "Internal"]
        );
        assert_eq!(rejected, vec!["9", "x"]);
    }

    #[test]
    fn test_field_edit_dates_recompute() {
        let mut e = Engagement::default();
        e.set_dates(
            NaiveDate::from_ymd_opt(2024, 3, 4).unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 4).unwrap(),
        );
        FieldEdit::EndDate(NaiveDate::from_ymd_opt(2024, 3, 15).unwrap()).apply(&mut e);
        assert_eq!(e.business_days_count, 10);
    }
}
