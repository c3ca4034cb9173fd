/// Prompt templates
///
/// Prompts are in Portuguese and length-bounded by the user's
/// [`DetailLevel`].

use serde_json::Value as JsonValue;

use crate::domain::aggregation::FinanceTotals;
use crate::models::user::DetailLevel;

/// System instruction for the finance chat
pub const FINANCE_CHAT_SYSTEM: &str =
    "Voce e um assistente financeiro para um SaaS. Responda com objetividade e foco em acao.";

/// Answer length rule for a detail level
pub fn detail_style(level: DetailLevel) -> &'static str {
    match level {
        DetailLevel::Low => "Nivel de detalhe: baixo. Responda em ate 5 linhas.",
        DetailLevel::Medium => {
            "Nivel de detalhe: medio. Responda em ate 120 palavras e use no maximo 4 bullets."
        }
        DetailLevel::High => {
            "Nivel de detalhe: alto. Responda em ate 220 palavras e use no maximo 6 bullets."
        }
    }
}

/// Prompt for `/ai/analyze`
pub fn analysis_prompt(data: &JsonValue, level: DetailLevel) -> String {
    [
        "Voce e um consultor estrategico de vendas SaaS.".to_string(),
        "Nao repita os mesmos argumentos. Evite respostas longas e redundantes.".to_string(),
        detail_style(level).to_string(),
        "Gere exatamente 4 secoes: padroes, riscos, oportunidades, recomendacoes.".to_string(),
        "Use linguagem clara, objetiva e orientada a acao.".to_string(),
        format!("Dados: {}", data),
    ]
    .join("\n")
}

/// Prompt for `/ai/chat`, wrapping a company context from
/// [`super::context::company_context`]
pub fn business_chat_prompt(context: &str, level: DetailLevel) -> String {
    [
        "Voce e um assistente de negocios para SaaS B2B.",
        "Responda sem repeticao e sem textos prolixos.",
        detail_style(level),
        "Se a pergunta estiver incompleta, diga qual dado falta em no maximo 2 frases.",
        context,
    ]
    .join("\n")
}

/// User message for `/chat`
pub fn finance_chat_input(context: &str, question: &str) -> String {
    format!("Contexto financeiro:\n{}\n\nPergunta:\n{}", context, question)
}

/// Answer built without a provider from company totals
pub fn local_fallback(totals: &FinanceTotals) -> String {
    if totals.transactions_count == 0 {
        return "Ainda nao existem transacoes cadastradas para esta empresa. \
                Cadastre receitas e despesas para gerar insights mais completos."
            .to_string();
    }

    let trend = if totals.balance >= 0.0 {
        "Saldo positivo. Priorize crescimento com controle de custos."
    } else {
        "Saldo negativo. Priorize corte de despesas e revisao de precificacao."
    };

    format!(
        "Resumo atual: receitas {}, despesas {}, saldo {}. {} \
         Posso detalhar por categoria se voce enviar mais transacoes com categoria preenchida.",
        totals.total_income, totals.total_expense, totals.balance, trend
    )
}
