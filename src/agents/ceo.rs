//! MicroCEO, the business-planning persona.
//!
//! Owns a budget ledger kept in integer cents so repeated spends cannot
//! drift, plus a goals map consulted by the report tool. Ledger rules:
//! amounts must be positive, a spend may never exceed the balance, and
//! every violation comes back as an error payload with the balance
//! untouched.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tokio::sync::Mutex;
use tracing::info;

use crate::agent::{Agent, AgentProfile, Reasoner};
use crate::config::Config;
use crate::llm::LlmClient;
use crate::memory::MemoryStore;
use crate::tools::{error_payload, optional_f64, required_str, str_or, Tool};

const ROLE: &str = "مدير تنفيذي ذكي";

const DESCRIPTION: &str = r#"رئيس تنفيذي ذكي قادر على:
- تحليل السوق واتخاذ قرارات استراتيجية
- تخطيط وتنفيذ المشاريع من الصفر
- إدارة الميزانية والموارد بفعالية
- إنشاء شركات ومشاريع قابلة للربح
- تحليل المنافسين وتحديد الفرص"#;

/// Build the CEO agent with the production starting balance.
pub fn build(config: &Config, llm: Option<Arc<dyn LlmClient>>) -> anyhow::Result<Agent> {
    let agent = build_with_budget(config, llm, 1000.0);
    info!("ceo persona ready");
    Ok(agent)
}

/// Build with an explicit starting balance; tests construct smaller.
pub fn build_with_budget(
    config: &Config,
    llm: Option<Arc<dyn LlmClient>>,
    initial_budget: f64,
) -> Agent {
    let ledger = Arc::new(Mutex::new(Ledger::new(initial_budget, "USD")));
    let goals: SharedGoals = Arc::new(Mutex::new(HashMap::new()));

    let mut profile = AgentProfile::new("MicroCEO", ROLE, DESCRIPTION);
    profile.temperature = 0.5;

    let memory = Arc::new(MemoryStore::new(
        config.workspace_path.join("memory").join("ceo"),
    ));

    let mut agent = Agent::new(profile, llm)
        .with_max_iterations(config.max_iterations)
        .with_memory(memory);
    agent.register_tool(Arc::new(MarketAnalysis));
    agent.register_tool(Arc::new(BusinessPlan {
        ledger: Arc::clone(&ledger),
    }));
    agent.register_tool(Arc::new(ManageBudget {
        ledger: Arc::clone(&ledger),
    }));
    agent.register_tool(Arc::new(GenerateReport {
        ledger: Arc::clone(&ledger),
        goals: Arc::clone(&goals),
    }));
    agent.register_tool(Arc::new(LaunchCompany { ledger }));
    agent
}

/// A business goal tracked by the report tool. Present in the data model;
/// no registered tool populates the map.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusinessGoal {
    pub id: String,
    pub name: String,
    pub description: String,
    pub target_cents: i64,
    pub current_cents: i64,
    pub priority: u8,
}

type SharedGoals = Arc<Mutex<HashMap<String, BusinessGoal>>>;

#[derive(Debug, Clone, Serialize)]
struct Expense {
    amount_cents: i64,
    category: String,
    description: String,
    timestamp: chrono::DateTime<Utc>,
}

/// The running budget, in integer cents.
struct Ledger {
    balance_cents: i64,
    currency: String,
    expenses: Vec<Expense>,
}

/// Convert a JSON amount in currency units to cents, rejecting
/// non-positive values.
fn to_cents(amount: f64) -> Option<i64> {
    let cents = (amount * 100.0).round() as i64;
    (cents > 0).then_some(cents)
}

fn cents_to_units(cents: i64) -> f64 {
    cents as f64 / 100.0
}

impl Ledger {
    fn new(initial_budget: f64, currency: &str) -> Self {
        Self {
            balance_cents: (initial_budget * 100.0).round().max(0.0) as i64,
            currency: currency.to_string(),
            expenses: Vec::new(),
        }
    }

    fn balance(&self) -> f64 {
        cents_to_units(self.balance_cents)
    }

    fn allocate(&mut self, amount: f64) -> Value {
        let Some(cents) = to_cents(amount) else {
            return error_payload("amount must be positive");
        };
        self.balance_cents += cents;
        json!({
            "action": "allocated",
            "amount": amount,
            "new_balance": self.balance(),
            "message": format!("allocated {} {}", amount, self.currency),
        })
    }

    fn spend(&mut self, amount: f64, category: &str, description: &str) -> Value {
        let Some(cents) = to_cents(amount) else {
            return error_payload("amount must be positive");
        };
        if cents > self.balance_cents {
            return error_payload("insufficient budget");
        }
        self.balance_cents -= cents;
        self.expenses.push(Expense {
            amount_cents: cents,
            category: category.to_string(),
            description: description.to_string(),
            timestamp: Utc::now(),
        });
        json!({
            "action": "spent",
            "amount": amount,
            "category": category,
            "new_balance": self.balance(),
        })
    }

    fn report(&self) -> Value {
        let total_cents: i64 = self.expenses.iter().map(|e| e.amount_cents).sum();
        json!({
            "currency": self.currency,
            "current_balance": self.balance(),
            "total_expenses": cents_to_units(total_cents),
            "transaction_count": self.expenses.len(),
        })
    }
}

/// LLM-delegated market and competitor analysis.
struct MarketAnalysis;

async fn run_market_analysis(reasoner: &Reasoner, market: &str, scope: &str) -> Value {
    let prompt = format!(
        r#"قم بتحليل السوق التالي: {market}
نطاق التحليل: {scope}

قدم تحليل شامل يتضمن:
1. حجم السوق ونموه المتوقع
2. أهم اللاعبين والمنافسين
3. الاتجاهات الحالية والمستقبلية
4. الفرص والتهديدات
5. شرائح العملاء المستهدفة
6. استراتيجيات التسعير الشائعة"#
    );

    let mut context = Map::new();
    context.insert("action".to_string(), json!("market_analysis"));
    let analysis = reasoner.think(&prompt, Some(&context)).await;

    json!({
        "market": market,
        "scope": scope,
        "analysis": analysis,
        "timestamp": Utc::now(),
    })
}

#[async_trait]
impl Tool for MarketAnalysis {
    fn name(&self) -> &str {
        "market_analysis"
    }

    fn description(&self) -> &str {
        "تحليل السوق المستهدف والمنافسين"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "market": {"type": "string", "description": "اسم السوق أو المنتج"},
                "scope": {"type": "string", "description": "نطاق التحليل"}
            },
            "required": ["market"]
        })
    }

    async fn execute(&self, args: Value, reasoner: &Reasoner) -> anyhow::Result<Value> {
        let market = required_str(&args, "market")?;
        let scope = str_or(&args, "scope", "global");
        Ok(run_market_analysis(reasoner, market, scope).await)
    }
}

/// LLM-delegated business plan; the prompt embeds the current balance.
struct BusinessPlan {
    ledger: Arc<Mutex<Ledger>>,
}

async fn run_business_plan(
    reasoner: &Reasoner,
    ledger: &Mutex<Ledger>,
    project_name: &str,
    description: &str,
    target_audience: &str,
) -> Value {
    let (balance, currency) = {
        let ledger = ledger.lock().await;
        (ledger.balance(), ledger.currency.clone())
    };

    let prompt = format!(
        r#"أنشئ خطة عمل كاملة للمشروع التالي:

اسم المشروع: {project_name}
الوصف: {description}
الجمهور المستهدف: {target_audience}

الميزانية المتاحة: {balance} {currency}

قدم خطة عمل تتضمن:
1. الملخص التنفيذي
2. وصف المنتج/الخدمة
3. تحليل السوق
4. استراتيجية التسويق
5. الخطة المالية
6. الجدول الزمني للتنفيذ"#
    );

    let mut context = Map::new();
    context.insert("action".to_string(), json!("business_plan"));
    let plan = reasoner.think(&prompt, Some(&context)).await;

    json!({
        "plan_id": format!("plan_{}", Utc::now().format("%Y%m%d_%H%M%S")),
        "project_name": project_name,
        "plan": plan,
    })
}

#[async_trait]
impl Tool for BusinessPlan {
    fn name(&self) -> &str {
        "business_plan"
    }

    fn description(&self) -> &str {
        "إنشاء خطة عمل كاملة للمشروع"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "project_name": {"type": "string", "description": "اسم المشروع"},
                "description": {"type": "string", "description": "وصف المشروع"},
                "target_audience": {"type": "string", "description": "الجمهور المستهدف"}
            },
            "required": ["project_name", "description"]
        })
    }

    async fn execute(&self, args: Value, reasoner: &Reasoner) -> anyhow::Result<Value> {
        let project_name = required_str(&args, "project_name")?;
        let description = required_str(&args, "description")?;
        let target_audience = str_or(&args, "target_audience", "general");
        Ok(run_business_plan(reasoner, &self.ledger, project_name, description, target_audience)
            .await)
    }
}

/// Ledger operations: allocate, spend, report.
struct ManageBudget {
    ledger: Arc<Mutex<Ledger>>,
}

#[async_trait]
impl Tool for ManageBudget {
    fn name(&self) -> &str {
        "manage_budget"
    }

    fn description(&self) -> &str {
        "إدارة الميزانية وتتبع المصروفات"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "action": {"type": "string", "description": "إجراء: allocate, spend, report"},
                "amount": {"type": "number", "description": "المبلغ"},
                "category": {"type": "string", "description": "الفئة"},
                "description": {"type": "string", "description": "الوصف"}
            },
            "required": ["action"]
        })
    }

    async fn execute(&self, args: Value, _reasoner: &Reasoner) -> anyhow::Result<Value> {
        let action = required_str(&args, "action")?;
        let mut ledger = self.ledger.lock().await;

        Ok(match action {
            "allocate" => match optional_f64(&args, "amount") {
                Some(amount) => ledger.allocate(amount),
                None => error_payload("amount is required"),
            },
            "spend" => match optional_f64(&args, "amount") {
                Some(amount) => ledger.spend(
                    amount,
                    str_or(&args, "category", "general"),
                    str_or(&args, "description", ""),
                ),
                None => error_payload("amount is required"),
            },
            "report" => ledger.report(),
            other => error_payload(format!("unknown budget action: {}", other)),
        })
    }
}

/// Compile a business report from the ledger and the goals map.
struct GenerateReport {
    ledger: Arc<Mutex<Ledger>>,
    goals: SharedGoals,
}

#[async_trait]
impl Tool for GenerateReport {
    fn name(&self) -> &str {
        "generate_report"
    }

    fn description(&self) -> &str {
        "إنشاء تقرير أداء شامل"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "report_type": {"type": "string", "description": "نوع التقرير"},
                "period": {"type": "string", "description": "الفترة الزمنية"}
            },
            "required": ["report_type"]
        })
    }

    async fn execute(&self, args: Value, _reasoner: &Reasoner) -> anyhow::Result<Value> {
        let _report_type = required_str(&args, "report_type")?;
        let period = str_or(&args, "period", "monthly");

        let (budget_report, balance) = {
            let ledger = self.ledger.lock().await;
            (ledger.report(), ledger.balance())
        };
        let goals = self.goals.lock().await;
        let achieved = goals
            .values()
            .filter(|g| g.current_cents >= g.target_cents)
            .count();

        Ok(json!({
            "report_id": format!("rpt_{}", Utc::now().format("%Y%m%d_%H%M%S")),
            "period": period,
            "goals_achieved": achieved,
            "goals_total": goals.len(),
            "resources_used": budget_report["total_expenses"],
            "resources_budget": balance,
            "key_insights": [
                "steady progress against the stated goals",
                "budget management is effective",
            ],
            "recommendations": [
                "increase marketing investment",
                "grow the customer base",
            ],
            "next_actions": [
                "review the monthly goals",
                "refresh the content strategy",
            ],
        }))
    }
}

/// Composite launch: allocate the investment, analyze the market, draft
/// the plan.
struct LaunchCompany {
    ledger: Arc<Mutex<Ledger>>,
}

#[async_trait]
impl Tool for LaunchCompany {
    fn name(&self) -> &str {
        "launch_company"
    }

    fn description(&self) -> &str {
        "إطلاق شركة جديدة من الصفر"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "company_type": {"type": "string", "description": "نوع الشركة"},
                "niche": {"type": "string", "description": "المجال المتخصص"},
                "initial_investment": {"type": "number", "description": "الاستثمار الأولي"}
            },
            "required": ["company_type", "niche"]
        })
    }

    async fn execute(&self, args: Value, reasoner: &Reasoner) -> anyhow::Result<Value> {
        let company_type = required_str(&args, "company_type")?;
        let niche = required_str(&args, "niche")?;
        let investment = optional_f64(&args, "initial_investment").unwrap_or(1000.0);

        let allocation = self.ledger.lock().await.allocate(investment);
        if allocation.get("error").is_some() {
            return Ok(allocation);
        }

        let market_analysis = run_market_analysis(reasoner, niche, "global").await;
        let business_plan = run_business_plan(
            reasoner,
            &self.ledger,
            &format!("{} in {}", company_type, niche),
            &format!("شركة متخصصة في مجال {}", niche),
            "العملاء المستهدفون",
        )
        .await;

        Ok(json!({
            "company_type": company_type,
            "niche": niche,
            "investment": investment,
            "market_analysis": market_analysis,
            "business_plan": business_plan,
            "status": "launched",
        }))
    }
}
