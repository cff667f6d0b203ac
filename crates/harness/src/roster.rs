use crewplan_core::{PersonId, ProjectId};

/// People and projects shared by a scenario.
pub struct TestRoster {
    people: Vec<PersonId>,
    projects: Vec<ProjectId>,
}

impl Default for TestRoster {
    fn default() -> Self {
        Self::new()
    }
}

impl TestRoster {
    pub fn new() -> Self {
        Self {
            people: Vec::new(),
            projects: Vec::new(),
        }
    }

    pub fn with_size(people: usize, projects: usize) -> Self {
        Self {
            people: (0..people).map(|_| PersonId::new()).collect(),
            projects: (0..projects).map(|_| ProjectId::new()).collect(),
        }
    }

    pub fn add_person(&mut self) -> PersonId {
        let id = PersonId::new();
        self.people.push(id);
        id
    }

    pub fn add_project(&mut self) -> ProjectId {
        let id = ProjectId::new();
        self.projects.push(id);
        id
    }

    pub fn person(&self, index: usize) -> PersonId {
        self.people[index]
    }

    pub fn project(&self, index: usize) -> ProjectId {
        self.projects[index]
    }

    pub fn people(&self) -> &[PersonId] {
        &self.people
    }
}
