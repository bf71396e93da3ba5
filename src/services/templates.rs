//! 模板库 - 业务能力层
//!
//! 根据文档元数据和提取出的数据生成功能代码块。
//! 所有生成函数都是纯函数：相同输入永远得到相同输出。

use phf::phf_map;

use crate::models::{DocumentMeta, FeatureName, LessonData, Topic};
use crate::services::registry::FeatureRegistry;

/// Howler.js 的 CDN 引用
pub const HOWLER_INCLUDE: &str =
    r#"<script src="https://cdn.jsdelivr.net/npm/howler@2.2.4/dist/howler.min.js"></script>"#;

/// 生成模板时可用的上下文
#[derive(Debug, Clone, Copy)]
pub struct TemplateContext<'a> {
    pub meta: &'a DocumentMeta,
    pub data: &'a LessonData,
    /// 音频资源目录（相对于课程页面）
    pub audio_base: &'a str,
}

/// 模板生成函数，缺少所需数据时返回 `None`
pub type TemplateFn = fn(&TemplateContext<'_>) -> Option<String>;

/// 主题相关的通知消息
struct TopicMessages {
    welcome: &'static [&'static str],
    encouragement: &'static [&'static str],
}

static TOPIC_MESSAGES: phf::Map<&'static str, TopicMessages> = phf_map! {
    "cells" => TopicMessages {
        welcome: &[
            "أهلاً وسهلاً {name}! مرحبًا بك في عالم الخلايا المثير! 🧬",
            "مرحبًا {name}! أنت على وشك اكتشاف أسرار الخلية! 🔬",
        ],
        encouragement: &[
            "رائع {name}! أنت تفهم الخلايا بشكل ممتاز! 🌟",
            "ممتاز {name}! معرفتك بالعضيات مذهلة! 💪",
        ],
    },
    "transport" => TopicMessages {
        welcome: &[
            "أهلاً وسهلاً {name}! مرحبًا بك في درس النقل والانتشار! 💧",
            "مرحبًا {name}! دعنا نتعلم كيف تتحرك المواد! 🚀",
        ],
        encouragement: &[
            "رائع {name}! فهمك للانتشار والنقل ممتاز! 🌊",
            "ممتاز {name}! أنت تتقن مفاهيم النقل! 🎯",
        ],
    },
    "biomolecules" => TopicMessages {
        welcome: &[
            "أهلاً وسهلاً {name}! مرحبًا بك في عالم الجزيئات الحيوية! 🧪",
            "مرحبًا {name}! دعنا نكتشف لبنات الحياة الكيميائية! ⚗️",
        ],
        encouragement: &[
            "رائع {name}! فهمك للبروتينات والكربوهيدرات ممتاز! 🧬",
            "أحسنت {name}! معرفتك بالإنزيمات مدهشة! ⚡",
        ],
    },
    "nutrition" => TopicMessages {
        welcome: &[
            "أهلاً وسهلاً {name}! مرحبًا بك في درس التغذية والتمثيل الضوئي! 🌱",
            "مرحبًا {name}! دعنا نتعلم كيف تصنع النباتات غذاءها! ☀️",
        ],
        encouragement: &[
            "رائع {name}! فهمك للتمثيل الضوئي رائع! 🌟",
            "أحسنت {name}! معرفتك بالتغذية النباتية مميزة! 🌺",
        ],
    },
    "respiration" => TopicMessages {
        welcome: &[
            "أهلاً وسهلاً {name}! مرحبًا بك في درس التنفس الخلوي! 💨",
            "مرحبًا {name}! دعنا نتعلم كيف تنتج الخلايا الطاقة! ⚡",
        ],
        encouragement: &[
            "رائع {name}! فهمك للتنفس والطاقة ممتاز! 🚀",
            "أحسنت {name}! معرفتك بالتنفس مدهشة! ⭐",
        ],
    },
    "homeostasis" => TopicMessages {
        welcome: &[
            "أهلاً وسهلاً {name}! مرحبًا بك في درس التوازن الداخلي! ⚖️",
            "مرحبًا {name}! دعنا نتعلم كيف يحافظ الجسم على توازنه! 🎯",
        ],
        encouragement: &[
            "رائع {name}! فهمك للتوازن الداخلي ممتاز! 🌟",
            "أحسنت {name}! معرفتك بالتنظيم الحيوي رائعة! ⚡",
        ],
    },
};

/// 没有专属消息的主题使用的通用消息
static GENERAL_MESSAGES: TopicMessages = TopicMessages {
    welcome: &[
        "أهلاً وسهلاً {name}! مرحبًا بك في هذا الدرس المثير! 🧬",
        "مرحبًا {name}! أنت على وشك تعلم شيء رائع! 🔬",
    ],
    encouragement: &[
        "ممتاز {name}! أنت تتقدم بشكل رائع! 🌟",
        "أحسنت {name}! استمر على هذا الأداء المميز! 💪",
    ],
};

fn messages_for(topic: Topic) -> &'static TopicMessages {
    TOPIC_MESSAGES.get(topic.slug()).unwrap_or(&GENERAL_MESSAGES)
}

/// 模板库
///
/// 持有音频资源路径，按功能名称分发到注册表中登记的生成函数
#[derive(Debug, Clone)]
pub struct TemplateLibrary {
    audio_base: String,
}

impl TemplateLibrary {
    pub fn new(audio_base: impl Into<String>) -> Self {
        Self {
            audio_base: audio_base.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn audio_base(&self) -> &str {
        &self.audio_base
    }

    /// 生成功能代码块
    ///
    /// # 返回
    /// 缺少所需数据（例如没有题目）时返回 `None`
    pub fn generate(
        &self,
        feature: FeatureName,
        meta: &DocumentMeta,
        data: &LessonData,
    ) -> Option<String> {
        let block = FeatureRegistry::global().get(feature)?;
        let ctx = TemplateContext {
            meta,
            data,
            audio_base: &self.audio_base,
        };
        (block.template)(&ctx)
    }
}

// ========== 生成函数 ==========

pub fn howler_include(_ctx: &TemplateContext<'_>) -> Option<String> {
    Some(HOWLER_INCLUDE.to_string())
}

pub fn sound_system(ctx: &TemplateContext<'_>) -> Option<String> {
    let sounds = [
        ("correct", "clap.mp3", "0.6"),
        ("wrong", "wrong_answer.mp3", "0.5"),
        ("click", "Click.mp3", "0.4"),
        ("select", "select.mp3", "0.4"),
        ("progress", "notification.mp3", "0.5"),
        ("milestone", "win.mp3", "0.6"),
        ("complete", "win-Blockbusters.mp3", "0.7"),
        ("start", "startapp.mp3", "0.5"),
    ];
    let entries = sounds
        .iter()
        .map(|(name, file, volume)| {
            format!(
                "    {}: new Howl({{ src: [{}], volume: {} }})",
                name,
                js_string(&format!("{}/{}", ctx.audio_base, file)),
                volume
            )
        })
        .collect::<Vec<_>>()
        .join(",\n");

    Some(format!(
        r#"const SoundSystem = {{
  // 🎵 النظام الصوتي
  sounds: {{
{entries}
  }},
  enabled: true,
  play(soundName) {{
    if (!this.enabled || !this.sounds[soundName]) return;
    try {{
      this.sounds[soundName].play();
    }} catch (error) {{
      console.log('تعذر تشغيل الصوت:', soundName);
    }}
  }},
  toggle() {{
    this.enabled = !this.enabled;
    return this.enabled;
  }}
}};"#
    ))
}

pub fn notification_system(ctx: &TemplateContext<'_>) -> Option<String> {
    let messages = messages_for(ctx.meta.topic);

    Some(format!(
        r#"const NotificationSystem = {{
  // 🔔 نظام الإشعارات
  student: null,
  topic: {topic},
  lessonTitle: {title},
  messages: {{
    welcome: {welcome},
    encouragement: {encouragement},
    motivation: [
      "لا تستسلم {{name}}! المحاولة جزء من التعلم! 💚",
      "فكر مرة أخرى {{name}}، أنت أقرب للإجابة الصحيحة! 🤔"
    ],
    milestone: [
      "🎉 ممتاز {{name}}! لقد أكملت 25% من الأسئلة!",
      "🚀 رائع {{name}}! وصلت لمنتصف الطريق - 50%!",
      "⭐ مذهل {{name}}! 75% مكتملة!",
      "🏆 تهانينا {{name}}! أكملت جميع الأسئلة بنجاح!"
    ]
  }},
  getPerformanceLevel(percentage) {{
    if (percentage >= 90) return 'excellent';
    if (percentage >= 75) return 'good';
    if (percentage >= 60) return 'average';
    return 'needsWork';
  }},
  getRandomMessage(category) {{
    const list = this.messages[category] || [];
    if (list.length === 0) return '';
    const msg = list[Math.floor(Math.random() * list.length)];
    return msg.replace('{{name}}', (this.student && this.student.name) || 'البطل/ة');
  }},
  showSmart(category, options = {{}}) {{
    if (typeof Swal === 'undefined') return;
    Swal.fire({{
      title: options.title || this.lessonTitle,
      text: this.getRandomMessage(category),
      icon: options.icon || 'info',
      timer: options.timer || 3000,
      timerProgressBar: true,
      showConfirmButton: false,
      toast: true,
      position: options.position || 'top-end'
    }});
  }}
}};"#,
        topic = js_string(ctx.meta.topic.slug()),
        title = js_string(&ctx.data.title),
        welcome = js_array(messages.welcome),
        encouragement = js_array(messages.encouragement),
    ))
}

pub fn progress_tracker(_ctx: &TemplateContext<'_>) -> Option<String> {
    Some(
        r#"const ProgressTracker = {
  // 📈 تتبع التقدم
  totalAnswered: 0,
  consecutiveCorrect: 0,
  startTime: Date.now(),
  milestones: [25, 50, 75, 100],
  reached: [],
  record(correct) {
    this.totalAnswered += 1;
    this.consecutiveCorrect = correct ? this.consecutiveCorrect + 1 : 0;
  },
  check(answered, total) {
    if (!total) return null;
    const percent = Math.round((answered / total) * 100);
    const milestone = this.milestones.find(m => percent >= m && !this.reached.includes(m));
    if (milestone === undefined) return null;
    this.reached.push(milestone);
    if (typeof SoundSystem !== 'undefined') {
      SoundSystem.play(milestone === 100 ? 'complete' : 'milestone');
    }
    return milestone;
  },
  reset() {
    this.totalAnswered = 0;
    this.consecutiveCorrect = 0;
    this.startTime = Date.now();
    this.reached = [];
  }
};"#
        .to_string(),
    )
}

pub fn quiz_bank(ctx: &TemplateContext<'_>) -> Option<String> {
    if ctx.data.questions.is_empty() {
        return None;
    }

    let items = ctx
        .data
        .questions
        .iter()
        .map(|q| {
            format!(
                "  {{q:{}, c:[{}], a:{}}},",
                js_string(q.prompt()),
                q.choices()
                    .iter()
                    .map(|c| js_string(c))
                    .collect::<Vec<_>>()
                    .join(", "),
                q.correct_index()
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    Some(format!("const bank = [\n{}\n];", items))
}

pub fn objectives_card(ctx: &TemplateContext<'_>) -> Option<String> {
    let objectives = ctx.data.objectives.as_ref().filter(|o| !o.is_empty())?;
    let items = objectives
        .items
        .iter()
        .map(|item| format!("    <li>{}</li>", item))
        .collect::<Vec<_>>()
        .join("\n");

    Some(format!(
        "<div class=\"card objectives\">\n  <h1>🎯 أهداف الدرس</h1>\n  <p class=\"lead\">{}</p>\n  <ul>\n{}\n  </ul>\n</div>",
        objectives.description, items
    ))
}

// ========== 工具函数 ==========

/// 生成 JS 双引号字符串字面量
pub fn js_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            _ => out.push(c),
        }
    }
    out.push('"');
    // 防止字符串中的 </script> 提前结束脚本
    out.replace("</", "<\\/")
}

fn js_array(items: &[&str]) -> String {
    let body = items
        .iter()
        .map(|item| format!("      {}", js_string(item)))
        .collect::<Vec<_>>()
        .join(",\n");
    format!("[\n{}\n    ]", body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ObjectiveList, Question};
    use crate::services::balance::check_balance;
    use crate::services::grammar::{first_match, QUESTION_RULES};

    fn data_with_questions() -> LessonData {
        LessonData {
            title: "النقل \"الخلوي\"".to_string(),
            questions: vec![
                Question::new(
                    "ما هو الانتشار؟ </script>",
                    vec!["حركة المواد".to_string(), "لا شيء".to_string()],
                    0,
                )
                .unwrap(),
                Question::new("س2", vec!["أ".to_string()], 0).unwrap(),
            ],
            objectives: None,
        }
    }

    #[test]
    fn test_quiz_bank_roundtrips_through_grammar() {
        let meta = DocumentMeta::new("unit-2-transport/lesson-2-1");
        let data = data_with_questions();
        let lib = TemplateLibrary::new("../../assets/audio");
        let block = lib.generate(FeatureName::QuizEngine, &meta, &data).unwrap();

        let wrapped = format!("<script>\n{}\n</script>", block);
        assert!(check_balance(&wrapped).is_balanced());
        let (_, questions) = first_match(QUESTION_RULES, &wrapped).hit.unwrap();
        assert_eq!(questions, data.questions);
    }

    #[test]
    fn test_missing_data_yields_none() {
        let meta = DocumentMeta::new("unit-1-cells/lesson-1-1");
        let lib = TemplateLibrary::new("../../assets/audio");
        let empty = LessonData::default();
        assert!(lib.generate(FeatureName::QuizEngine, &meta, &empty).is_none());
        assert!(lib
            .generate(FeatureName::LearningObjectives, &meta, &empty)
            .is_none());
        assert!(lib.generate(FeatureName::SoundSystem, &meta, &empty).is_some());
    }

    #[test]
    fn test_notification_messages_follow_topic() {
        let lib = TemplateLibrary::new("../../assets/audio/");
        let data = LessonData::default();

        let cells = lib
            .generate(
                FeatureName::NotificationSystem,
                &DocumentMeta::new("unit-1-cells/lesson-1-1"),
                &data,
            )
            .unwrap();
        assert!(cells.contains("عالم الخلايا"));

        let general = lib
            .generate(
                FeatureName::NotificationSystem,
                &DocumentMeta::new("extra/lesson-x"),
                &data,
            )
            .unwrap();
        assert!(general.contains("هذا الدرس المثير"));
        assert!(check_balance(&format!("<script>{}</script>", general)).is_balanced());
    }

    #[test]
    fn test_sound_system_uses_audio_base() {
        let lib = TemplateLibrary::new("/static/audio/");
        let block = lib
            .generate(
                FeatureName::SoundSystem,
                &DocumentMeta::new("unit-1-cells/lesson-1-1"),
                &LessonData::default(),
            )
            .unwrap();
        assert!(block.contains(r#"src: ["/static/audio/clap.mp3"]"#));
    }

    #[test]
    fn test_objectives_card() {
        let data = LessonData {
            title: String::new(),
            questions: Vec::new(),
            objectives: Some(ObjectiveList {
                description: "في نهاية الدرس".to_string(),
                items: vec!["أ".to_string(), "ب".to_string()],
            }),
        };
        let ctx = TemplateContext {
            meta: &DocumentMeta::new("unit-1-cells/lesson-1-1"),
            data: &data,
            audio_base: "",
        };
        let card = objectives_card(&ctx).unwrap();
        assert!(card.starts_with(r#"<div class="card objectives">"#));
        assert_eq!(card.matches("<li>").count(), 2);
        assert!(check_balance(&card).is_balanced());
    }
}
