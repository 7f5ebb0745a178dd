use serde::{Deserialize, Serialize};

use crate::domain::{MenuItem, MenuLink};

/// Layout preferences and the sidebar navigation tree.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SettingsStore {
    show_footbar: bool,
    sidebar_menu_items: Vec<MenuItem>,
}

impl Default for SettingsStore {
    fn default() -> Self {
        Self {
            show_footbar: true,
            sidebar_menu_items: default_menu(),
        }
    }
}

impl SettingsStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn show_footbar(&self) -> bool {
        self.show_footbar
    }

    /// Flips footer visibility and returns the new value.
    pub fn toggle_footbar(&mut self) -> bool {
        self.show_footbar = !self.show_footbar;
        self.show_footbar
    }

    pub fn menu_items(&self) -> &[MenuItem] {
        &self.sidebar_menu_items
    }

    /// Replaces the whole menu tree.
    pub fn update_menu_items(&mut self, items: Vec<MenuItem>) {
        self.sidebar_menu_items = items;
    }

    /// Finds the section and link that route to `href`.
    pub fn find_by_href(&self, href: &str) -> Option<(&MenuItem, &MenuLink)> {
        self.sidebar_menu_items.iter().find_map(|section| {
            section
                .children
                .iter()
                .find(|link| link.href == href)
                .map(|link| (section, link))
        })
    }
}

pub fn default_menu() -> Vec<MenuItem> {
    vec![
        MenuItem::new("Dashboard", "ChartBarIcon")
            .with_link("System Overview", "/dashboard/overview")
            .with_link("Data Monitoring", "/dashboard/monitoring")
            .with_link("Performance", "/dashboard/performance"),
        MenuItem::new("Stock Management", "BuildingOfficeIcon")
            .with_link("Stock List", "/stocks/list")
            .with_link("Stock Updates", "/stocks/update")
            .with_link("Categories", "/stocks/categories"),
        MenuItem::new("Data Management", "CircleStackIcon")
            .with_link("Historical Data", "/data/historical")
            .with_link("Data Updates", "/data/update")
            .with_link("Data Quality", "/data/quality"),
        MenuItem::new("Technical Analysis", "PresentationChartLineIcon")
            .with_link("Moving Averages", "/analysis/moving-averages")
            .with_link("Indicators", "/analysis/indicators")
            .with_link("Parameters", "/analysis/parameters"),
        MenuItem::new("Screening Results", "StarIcon")
            .with_link("Recommendations", "/screening/recommendations")
            .with_link("Filters", "/screening/filters")
            .with_link("History", "/screening/history"),
        MenuItem::new("Task Management", "ClockIcon")
            .with_link("Scheduled Tasks", "/tasks/scheduled")
            .with_link("Manual Execution", "/tasks/manual")
            .with_link("Execution Logs", "/tasks/logs"),
        MenuItem::new("System Settings", "CogIcon")
            .with_link("System Parameters", "/settings/system")
            .with_link("Data Sources", "/settings/datasource")
            .with_link("Notifications", "/settings/notifications")
            .with_link("User Management", "/settings/users"),
    ]
}
