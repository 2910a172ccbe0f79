use chrono::NaiveTime;

use super::{StoreError, StoreResult, record};
use crate::api::Api;
use crate::model::{Id, RecurrencePayload, RecurrenceType, RecurringTask};
use crate::ops::weekday::{SundayFirst, days_to_backend, days_to_frontend};

/// Recurrence as a user edits it. Days are in the Sunday-first numbering;
/// they are converted only when a payload is built or a form is hydrated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecurrenceForm {
    pub title: String,
    pub section_id: Option<Id>,
    pub recurrence_type: RecurrenceType,
    pub days: Vec<SundayFirst>,
    /// `HH:MM`
    pub time: Option<String>,
}

impl RecurrenceForm {
    pub fn new(title: &str, section_id: Id, recurrence_type: RecurrenceType) -> Self {
        RecurrenceForm {
            title: title.to_string(),
            section_id: Some(section_id),
            recurrence_type,
            days: Vec::new(),
            time: None,
        }
    }

    /// Fill a form from a stored recurrence.
    pub fn from_stored(task: &RecurringTask) -> Self {
        RecurrenceForm {
            title: task.title.clone(),
            section_id: Some(task.section_id),
            recurrence_type: task.recurrence_type,
            days: days_to_frontend(&task.recurrence_days),
            time: Some(task.recurrence_time.clone()),
        }
    }

    /// Check the form and build the request body.
    pub fn to_payload(&self) -> StoreResult<RecurrencePayload> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(StoreError::Validation("title is required".into()));
        }
        let section_id = self
            .section_id
            .ok_or_else(|| StoreError::Validation("section is required".into()))?;
        let time = self
            .time
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| StoreError::Validation("time is required".into()))?;
        let time = NaiveTime::parse_from_str(time, "%H:%M").map_err(|_| {
            StoreError::Validation(format!("time '{}' is not a valid HH:MM time", time))
        })?;

        let recurrence_days = match self.recurrence_type {
            RecurrenceType::Weekly => {
                if self.days.is_empty() {
                    return Err(StoreError::Validation(
                        "weekly recurrences need at least one day".into(),
                    ));
                }
                days_to_backend(&self.days)
            }
            RecurrenceType::Daily | RecurrenceType::AlternateDays => Vec::new(),
        };

        Ok(RecurrencePayload {
            section_id,
            title: title.to_string(),
            recurrence_type: self.recurrence_type,
            recurrence_days,
            recurrence_time: time.format("%H:%M").to_string(),
        })
    }
}

pub struct RecurringStore<'a> {
    api: &'a dyn Api,
    recurring: Vec<RecurringTask>,
    error: Option<String>,
}

impl<'a> RecurringStore<'a> {
    pub fn new(api: &'a dyn Api) -> Self {
        RecurringStore {
            api,
            recurring: Vec::new(),
            error: None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn all(&self) -> &[RecurringTask] {
        &self.recurring
    }

    pub fn get(&self, id: Id) -> Option<&RecurringTask> {
        self.recurring.iter().find(|r| r.id == id)
    }

    pub fn load(&mut self) -> StoreResult<()> {
        self.error = None;
        self.recurring = self
            .api
            .list_recurring()
            .map_err(|e| record(&mut self.error, e))?;
        Ok(())
    }

    /// Form for editing a cached recurrence
    pub fn hydrate(&self, id: Id) -> Option<RecurrenceForm> {
        self.get(id).map(RecurrenceForm::from_stored)
    }

    /// Validate and create. The server generates the first task instance,
    /// so callers showing the section should reload its tasks.
    pub fn create(&mut self, form: &RecurrenceForm) -> StoreResult<RecurringTask> {
        self.error = None;
        let payload = form.to_payload().map_err(|e| record(&mut self.error, e))?;
        let created = self
            .api
            .create_recurring(&payload)
            .map_err(|e| record(&mut self.error, e))?;
        tracing::debug!(id = created.id, kind = %created.recurrence_type, "recurrence created");
        self.recurring.push(created.clone());
        Ok(created)
    }

    pub fn update(&mut self, id: Id, form: &RecurrenceForm) -> StoreResult<RecurringTask> {
        self.error = None;
        let payload = form.to_payload().map_err(|e| record(&mut self.error, e))?;
        if self.get(id).is_none() {
            return Err(record(
                &mut self.error,
                StoreError::UnknownId {
                    resource: "recurring task",
                    id,
                },
            ));
        }
        let updated = self
            .api
            .update_recurring(id, &payload)
            .map_err(|e| record(&mut self.error, e))?;
        if let Some(cached) = self.recurring.iter_mut().find(|r| r.id == id) {
            *cached = updated.clone();
        }
        Ok(updated)
    }

    pub fn delete(&mut self, id: Id) -> StoreResult<()> {
        self.error = None;
        self.api
            .delete_recurring(id)
            .map_err(|e| record(&mut self.error, e))?;
        self.recurring.retain(|r| r.id != id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::MemoryApi;
    use crate::model::{NewProject, NewSection};

    fn section(api: &MemoryApi) -> Id {
        let project = api
            .create_project(&NewProject {
                name: "Habits".into(),
                ..Default::default()
            })
            .unwrap();
        api.create_section(&NewSection {
            project_id: project.id,
            name: "Daily".into(),
            order_index: 0,
        })
        .unwrap()
        .id
    }

    fn days(values: &[u8]) -> Vec<SundayFirst> {
        values.iter().map(|&d| SundayFirst::new(d).unwrap()).collect()
    }

    #[test]
    fn test_mon_wed_fri_round_trip() {
        let api = MemoryApi::new();
        let section_id = section(&api);
        let mut store = RecurringStore::new(&api);
        let mut form = RecurrenceForm::new("Gym", section_id, RecurrenceType::Weekly);
        form.days = days(&[1, 3, 5]);
        form.time = Some("18:00".into());

        let created = store.create(&form).unwrap();
        let wire: Vec<u8> = created.recurrence_days.iter().map(|d| d.get()).collect();
        assert_eq!(wire, vec![0, 2, 4]);

        let mut fresh = RecurringStore::new(&api);
        fresh.load().unwrap();
        let hydrated = fresh.hydrate(created.id).unwrap();
        assert_eq!(hydrated.days, days(&[1, 3, 5]));
        assert_eq!(hydrated, form);
    }

    #[test]
    fn test_sunday_maps_to_six() {
        let mut form = RecurrenceForm::new("Plan week", 1, RecurrenceType::Weekly);
        form.days = days(&[0, 6, 0]);
        form.time = Some("9:05".into());
        let payload = form.to_payload().unwrap();
        let wire: Vec<u8> = payload.recurrence_days.iter().map(|d| d.get()).collect();
        assert_eq!(wire, vec![5, 6]);
        assert_eq!(payload.recurrence_time, "09:05");
    }

    #[test]
    fn test_validation_happens_before_any_request() {
        let api = MemoryApi::new();
        let mut store = RecurringStore::new(&api);

        let mut form = RecurrenceForm::new("  ", 1, RecurrenceType::Daily);
        form.time = Some("08:00".into());
        assert!(matches!(store.create(&form), Err(StoreError::Validation(_))));

        let form = RecurrenceForm::new("Read", 1, RecurrenceType::Daily);
        assert!(matches!(store.create(&form), Err(StoreError::Validation(_))));

        let mut form = RecurrenceForm::new("Read", 1, RecurrenceType::Daily);
        form.time = Some("25:00".into());
        assert!(matches!(store.create(&form), Err(StoreError::Validation(_))));

        let mut form = RecurrenceForm::new("Read", 1, RecurrenceType::Weekly);
        form.time = Some("08:00".into());
        assert!(matches!(store.create(&form), Err(StoreError::Validation(_))));

        assert!(store.error().is_some());
        assert!(api.calls().is_empty());
    }

    #[test]
    fn test_daily_drops_days() {
        let mut form = RecurrenceForm::new("Walk", 3, RecurrenceType::AlternateDays);
        form.days = days(&[2]);
        form.time = Some("07:00".into());
        assert!(form.to_payload().unwrap().recurrence_days.is_empty());
    }
}
