use serde::{Deserialize, Serialize};

use normbot_core::domain::turn::{Role, Turn};

use crate::conversation::MemoryWindow;

pub const SYSTEM_INSTRUCTION: &str = "\
Ты — ЕСКД-ассистент уровня «нормоконтроль»: опытный чертёжник/инженер и практик по маркировке/упаковке.
Пиши как человек: дружелюбно, уверенно и по делу.
НЕ используй Markdown-разметку (никаких **, #, таблиц markdown).
Разрешены обычные списки с \"1) 2) 3)\" и короткие блоки.

Главная логика:
- Если данных достаточно: дай готовый результат (что делать, какие нормы, что открыть в тексте).
- Если данных мало: задай 2–5 точных вопросов (не общих), затем дай предварительный ориентир.
- Не выдумывай стандарты. Если не уверен, так и скажи и предложи, где проверить по официальному тексту.

Формат ответа, когда можно отвечать по существу:
1) Краткий вывод (1–2 предложения)
2) Уточняющие вопросы (если нужно)
3) Алгоритм действий (1) 2) 3))
4) Нормативка (ГОСТ/ТР): по 1–2 в строке и зачем
5) Что открыть в официальном тексте (разделы/пункты; если не уверен в пункте, так и напиши)
6) Ссылки на поиск официальных текстов (2–4 строки, только поисковые ссылки)

Подсказки по доменам:
- ЕСКД: выясни (деталь/сборка), формат, что оформляем (рамка/штамп/шрифты/размеры/допуски/виды/спецификация).
- Маркировка: выясни тип товара (еда/косметика/быт/мед/химия), территорию (ЕАЭС/РФ), упаковку, контакт с кожей/пищей, состав/материал.
- Салфетки: важно (влажные/сухие), назначение (гигиена/косметика/быт), материал основы, для влажных состав пропитки, условия хранения, изготовитель, партия/дата, обязательные надписи/знаки.";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: ChatRole::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: ChatRole::User, content: content.into() }
    }
}

impl From<&Turn> for ChatMessage {
    fn from(turn: &Turn) -> Self {
        let role = match turn.role {
            Role::User => ChatRole::User,
            Role::Assistant => ChatRole::Assistant,
        };
        Self { role, content: turn.content.clone() }
    }
}

#[derive(Clone, Debug)]
pub struct PromptComposer {
    system_instruction: String,
}

impl Default for PromptComposer {
    fn default() -> Self {
        Self::new(SYSTEM_INSTRUCTION)
    }
}

impl PromptComposer {
    pub fn new(system_instruction: impl Into<String>) -> Self {
        Self { system_instruction: system_instruction.into() }
    }

    /// System instruction first, then the window in order, then the current turn.
    pub fn compose(&self, window: &MemoryWindow, current_text: &str) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(window.len() + 2);
        messages.push(ChatMessage::system(self.system_instruction.clone()));
        messages.extend(window.turns().iter().map(ChatMessage::from));
        messages.push(ChatMessage::user(current_text));
        messages
    }
}

#[cfg(test)]
mod tests {
    use normbot_core::domain::turn::Turn;

    use super::{ChatMessage, ChatRole, PromptComposer};
    use crate::conversation::MemoryWindow;

    #[test]
    fn compose_orders_system_history_then_current() {
        let window = MemoryWindow::from_turns(vec![
            Turn::user("Чертёж детали"),
            Turn::assistant("Какой формат листа?"),
        ]);

        let messages = PromptComposer::default().compose(&window, "А3");

        assert_eq!(messages.len(), 4);
        assert_eq!(messages[0].role, ChatRole::System);
        assert_eq!(messages[1], ChatMessage::user("Чертёж детали"));
        assert_eq!(messages[2].role, ChatRole::Assistant);
        assert_eq!(messages[3], ChatMessage::user("А3"));
    }

    #[test]
    fn system_instruction_forbids_markdown_and_invented_standards() {
        let messages = PromptComposer::default().compose(&MemoryWindow::default(), "вопрос");
        let system = &messages[0].content;
        assert!(system.contains("НЕ используй Markdown"));
        assert!(system.contains("Не выдумывай стандарты"));
        assert!(system.contains("2–5 точных вопросов"));
    }

    #[test]
    fn roles_serialize_as_wire_names() {
        let json = serde_json::to_value(ChatMessage::system("x")).expect("serialize");
        assert_eq!(json["role"], "system");
    }
}
