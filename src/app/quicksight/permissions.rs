//! Action sets granted to owners and readers.

pub const DATA_SOURCE_OWNER_ACTIONS: &[&str] = &[
    "quicksight:DescribeDataSource",
    "quicksight:DescribeDataSourcePermissions",
    "quicksight:PassDataSource",
    "quicksight:UpdateDataSource",
    "quicksight:DeleteDataSource",
    "quicksight:UpdateDataSourcePermissions",
];

pub const DATA_SET_OWNER_ACTIONS: &[&str] = &[
    "quicksight:UpdateDataSetPermissions",
    "quicksight:DescribeDataSet",
    "quicksight:DescribeDataSetPermissions",
    "quicksight:PassDataSet",
    "quicksight:DescribeIngestion",
    "quicksight:ListIngestions",
    "quicksight:UpdateDataSet",
    "quicksight:DeleteDataSet",
    "quicksight:CreateIngestion",
    "quicksight:CancelIngestion",
];

pub const DASHBOARD_OWNER_ACTIONS: &[&str] = &[
    "quicksight:DescribeDashboard",
    "quicksight:ListDashboardVersions",
    "quicksight:UpdateDashboardPermissions",
    "quicksight:QueryDashboard",
    "quicksight:UpdateDashboard",
    "quicksight:DeleteDashboard",
    "quicksight:DescribeDashboardPermissions",
    "quicksight:UpdateDashboardPublishedVersion",
];

pub const DASHBOARD_READER_ACTIONS: &[&str] = &[
    "quicksight:DescribeDashboard",
    "quicksight:ListDashboardVersions",
    "quicksight:QueryDashboard",
];

pub const ANALYSIS_OWNER_ACTIONS: &[&str] = &[
    "quicksight:RestoreAnalysis",
    "quicksight:UpdateAnalysisPermissions",
    "quicksight:DeleteAnalysis",
    "quicksight:QueryAnalysis",
    "quicksight:DescribeAnalysisPermissions",
    "quicksight:DescribeAnalysis",
    "quicksight:UpdateAnalysis",
];

pub const THEME_OWNER_ACTIONS: &[&str] = &[
    "quicksight:ListThemeVersions",
    "quicksight:UpdateThemeAlias",
    "quicksight:UpdateThemePermissions",
    "quicksight:DescribeThemeAlias",
    "quicksight:DeleteThemeAlias",
    "quicksight:DeleteTheme",
    "quicksight:ListThemeAliases",
    "quicksight:DescribeTheme",
    "quicksight:CreateThemeAlias",
    "quicksight:UpdateTheme",
    "quicksight:DescribeThemePermissions",
];

/// Granted on a source template so another account can copy it.
pub const TEMPLATE_SHARE_ACTIONS: &[&str] = &["quicksight:DescribeTemplate"];
