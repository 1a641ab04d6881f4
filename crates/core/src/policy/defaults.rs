use super::{
    AnswerSuggestionTable, ClarificationTable, ClarificationTemplate, DomainKeywords, DomainTag,
    ModerationTable, PolicyTables,
};

pub const DEFAULT_POLICY_VERSION: u32 = 1;

const PROFANITY: &[&str] =
    &["бля", "сука", "хуй", "хуе", "пизд", "еба", "ёба", "манда", "шлюх", "мудак", "гондон"];

const SEXUAL: &[&str] =
    &["порно", "секс", "эрот", "аналь", "ораль", "минет", "мастурб", "фетиш", "инцест"];

const DRAWING_KEYWORDS: &[&str] = &[
    "ескд", "черт", "чертёж", "рамк", "основн", "надпис", "штамп", "формат", "шрифт", "вид",
    "разрез", "сечен", "спецификац", "размер", "допуск", "шероховат", "посадк", "обозначен",
    "позици", "тех треб",
];

const LABELING_KEYWORDS: &[&str] = &[
    "маркировк", "упаковк", "этикет", "состав", "срок год", "условия хран", "производит",
    "импортер", "изготовит", "еас", "тр тс", "тр еаэс", "безопасн", "партия", "дата изготов",
    "масса нетто", "объем", "штрихкод", "гост", "декларация", "сертиф",
    // product names that almost always mean a labeling question
    "салфетк", "майонез", "кетчуп", "молок", "сыр", "колбас", "напит", "конфет", "шампун", "крем",
];

const DRAWING_CLARIFICATION: &str = "\
Уточню пару деталей — и дам точный алгоритм по ЕСКД:
1) Это чертёж детали или сборочный?
2) Формат листа (А4/А3/…)?
3) Что нужно: рамка/основная надпись, шрифты, размеры/допуски, виды/разрезы, спецификация?

Можно ответить одним сообщением: «деталь, А3, нужна рамка и основная надпись».";

const LABELING_CLARIFICATION: &str = "\
Ок, по маркировке лучше уточнить 2–3 вещи — тогда попадём точно:
1) Что за товар? (например: влажные/сухие салфетки; пищевая продукция; косметика и т.д.)
2) Для какой территории: РФ/ЕАЭС?
3) Что нужно именно: обязательные надписи на упаковке, состав/материал, условия хранения, знаки (ЕАС), требования к тексту/шрифту?

Ответьте одной строкой, например: «влажные салфетки, ЕАЭС, нужна маркировка на упаковке».";

const GENERIC_CLARIFICATION: &str = "\
Чтобы ответ был точным, уточню направление:
Вы написали: \"{{ user_text }}\". Это про:
1) ЕСКД/чертежи
2) ГОСТ/ТР для товара/упаковки/маркировки
3) Другое (что именно нужно сделать/проверить?)

Ответьте цифрой и добавьте 1–2 детали.";

fn owned(items: &[&str]) -> Vec<String> {
    items.iter().map(|item| (*item).to_string()).collect()
}

impl Default for PolicyTables {
    fn default() -> Self {
        Self {
            version: DEFAULT_POLICY_VERSION,
            moderation: ModerationTable { profanity: owned(PROFANITY), sexual: owned(SEXUAL) },
            domains: vec![
                DomainKeywords {
                    tag: DomainTag::TechnicalDrawing,
                    keywords: owned(DRAWING_KEYWORDS),
                },
                DomainKeywords {
                    tag: DomainTag::ProductLabeling,
                    keywords: owned(LABELING_KEYWORDS),
                },
            ],
            clarifications: ClarificationTable {
                technical_drawing: ClarificationTemplate {
                    template: DRAWING_CLARIFICATION.to_string(),
                    suggestions: owned(&[
                        "Деталь, А4 — рамка/штамп",
                        "Деталь, А3 — шрифты",
                        "Сборочный — спецификация",
                        "Размеры/допуски",
                        "Виды/разрезы/сечения",
                    ]),
                },
                product_labeling: ClarificationTemplate {
                    template: LABELING_CLARIFICATION.to_string(),
                    suggestions: owned(&[
                        "ЕАЭС — обязательные надписи",
                        "Салфетки влажные — упаковка",
                        "Салфетки сухие — упаковка",
                        "Пищевая продукция — этикетка",
                        "Косметика — маркировка",
                    ]),
                },
                generic: ClarificationTemplate {
                    template: GENERIC_CLARIFICATION.to_string(),
                    suggestions: owned(&["1 (ЕСКД)", "2 (Маркировка)", "3 (Другое)"]),
                },
            },
            answer_suggestions: AnswerSuggestionTable {
                technical_drawing: owned(&[
                    "Деталь, А4",
                    "Деталь, А3",
                    "Сборочный",
                    "Нужна рамка/штамп",
                    "Нужны шрифты",
                ]),
                default: owned(&[
                    "Для ЕАЭС",
                    "Для РФ",
                    "Влажные",
                    "Сухие",
                    "Нужна маркировка на упаковке",
                ]),
            },
            clarification_markers: owned(&["уточняющ", "уточню", "уточните"]),
        }
    }
}
