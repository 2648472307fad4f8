//! Report template catalog offered to report renderers.

use serde::Serialize;

/// One report layout a renderer can produce from a `ScoreReport`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReportTemplate {
    pub id: &'static str,
    pub name: &'static str,
    pub name_ar: &'static str,
    pub description: &'static str,
    pub description_ar: &'static str,
    /// Expected page range, e.g. `8-12`.
    pub pages: &'static str,
    pub includes: &'static [&'static str],
}

const REPORT_TEMPLATES: &[ReportTemplate] = &[
    ReportTemplate {
        id: "comprehensive",
        name: "Comprehensive Report",
        name_ar: "تقرير شامل",
        description: "Complete assessment report with all details",
        description_ar: "تقرير تقييم كامل مع جميع التفاصيل",
        pages: "8-12",
        includes: &[
            "client_info",
            "results",
            "charts",
            "recommendations",
            "action_plan",
        ],
    },
    ReportTemplate {
        id: "summary",
        name: "Executive Summary",
        name_ar: "ملخص تنفيذي",
        description: "Brief overview with key findings",
        description_ar: "نظرة عامة موجزة مع النتائج الرئيسية",
        pages: "3-5",
        includes: &["client_info", "overall_score", "key_recommendations"],
    },
    ReportTemplate {
        id: "detailed",
        name: "Detailed Analysis",
        name_ar: "تحليل مفصل",
        description: "In-depth analysis with category breakdowns",
        description_ar: "تحليل متعمق مع تفصيل الفئات",
        pages: "10-15",
        includes: &[
            "client_info",
            "results",
            "category_breakdown",
            "charts",
            "detailed_recommendations",
        ],
    },
];

/// Returns all report templates in display order.
pub fn report_templates() -> &'static [ReportTemplate] {
    REPORT_TEMPLATES
}

/// Looks up one template by id.
pub fn find_report_template(id: &str) -> Option<&'static ReportTemplate> {
    REPORT_TEMPLATES.iter().find(|template| template.id == id)
}
