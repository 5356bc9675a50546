//! Rendering stored media paths as public URLs

use crate::media::MediaStore;
use crate::models::{
    Attachment, Employee, EmployeeRef, Project, ProjectDetail, TeamMemberView, Ticket,
    TicketAllocation, TicketGroup,
};

pub trait WithMediaUrls: Sized {
    fn with_media_urls(self, media: &MediaStore) -> Self;
}

impl<T: WithMediaUrls> WithMediaUrls for Vec<T> {
    fn with_media_urls(self, media: &MediaStore) -> Self {
        self.into_iter().map(|item| item.with_media_urls(media)).collect()
    }
}

impl WithMediaUrls for Project {
    fn with_media_urls(mut self, media: &MediaStore) -> Self {
        self.logo = media.url(&self.logo);
        self
    }
}

impl WithMediaUrls for ProjectDetail {
    fn with_media_urls(mut self, media: &MediaStore) -> Self {
        self.project = self.project.with_media_urls(media);
        self
    }
}

impl WithMediaUrls for Employee {
    fn with_media_urls(mut self, media: &MediaStore) -> Self {
        self.photo = media.url_opt(self.photo.as_deref());
        self
    }
}

impl WithMediaUrls for TeamMemberView {
    fn with_media_urls(mut self, media: &MediaStore) -> Self {
        self.photo = media.url_opt(self.photo.as_deref());
        self
    }
}

impl WithMediaUrls for EmployeeRef {
    fn with_media_urls(mut self, media: &MediaStore) -> Self {
        self.photo = media.url_opt(self.photo.as_deref());
        self
    }
}

impl WithMediaUrls for TicketAllocation {
    fn with_media_urls(mut self, media: &MediaStore) -> Self {
        self.assigned_users = self.assigned_users.with_media_urls(media);
        self.created_by = self.created_by.with_media_urls(media);
        self.updated_by = self.updated_by.with_media_urls(media);
        self.deleted_by = self.deleted_by.with_media_urls(media);
        self
    }
}

impl WithMediaUrls for Ticket {
    fn with_media_urls(mut self, media: &MediaStore) -> Self {
        self.allocations = self.allocations.with_media_urls(media);
        self
    }
}

impl WithMediaUrls for TicketGroup {
    fn with_media_urls(mut self, media: &MediaStore) -> Self {
        self.data = self.data.with_media_urls(media);
        self
    }
}

impl WithMediaUrls for Attachment {
    fn with_media_urls(mut self, media: &MediaStore) -> Self {
        self.files = media.url(&self.files);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MediaConfig;

    #[test]
    fn nested_photos_become_urls() {
        let media = MediaStore::new(&MediaConfig::default());
        let employee = EmployeeRef {
            id: "e1".to_string(),
            employee_name: "Jane Doe".to_string(),
            photo: Some("employee/e1/e1_photo.jpg".to_string()),
        };
        let rendered = vec![employee].with_media_urls(&media);
        assert_eq!(
            rendered[0].photo.as_deref(),
            Some("/media/employee/e1/e1_photo.jpg")
        );

        let project = Project {
            id: "p".to_string(),
            name: "Tracker".to_string(),
            erp_id: 1,
            short_code: "TRK".to_string(),
            logo: String::new(),
        };
        assert_eq!(project.with_media_urls(&media).logo, "");
    }
}
