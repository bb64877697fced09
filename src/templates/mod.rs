//! Localized notification templates.
//!
//! One data-driven table keyed by `(language, kind)`; every entry is a pure
//! formatting function over ticket fields. Unknown languages fall back to
//! Swedish, which exists for every kind, so resolution is total.

use serde::{Deserialize, Serialize};

use crate::tickets::ServiceTicket;

pub const DEFAULT_LANGUAGE: &str = "sv";

/// The purpose of an outbound notification.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    CostProposal,
    RepairReady,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedTemplate {
    pub subject: String,
    pub body: String,
}

type TemplateFn = fn(&ServiceTicket) -> RenderedTemplate;

pub fn resolve(ticket: &ServiceTicket, kind: NotificationKind, language: &str) -> RenderedTemplate {
    let template = template_for(language, kind).unwrap_or_else(|| default_template(kind));
    template(ticket)
}

fn template_for(language: &str, kind: NotificationKind) -> Option<TemplateFn> {
    TEMPLATES
        .iter()
        .find(|(lang, k, _)| *lang == language && *k == kind)
        .map(|(_, _, template)| *template)
}

fn default_template(kind: NotificationKind) -> TemplateFn {
    match kind {
        NotificationKind::CostProposal => sv_cost_proposal,
        NotificationKind::RepairReady => sv_repair_ready,
    }
}

static TEMPLATES: &[(&str, NotificationKind, TemplateFn)] = &[
    ("sv", NotificationKind::CostProposal, sv_cost_proposal),
    ("sv", NotificationKind::RepairReady, sv_repair_ready),
    ("en", NotificationKind::CostProposal, en_cost_proposal),
    ("en", NotificationKind::RepairReady, en_repair_ready),
    ("ar", NotificationKind::CostProposal, ar_cost_proposal),
    ("ar", NotificationKind::RepairReady, ar_repair_ready),
    ("es", NotificationKind::CostProposal, es_cost_proposal),
    ("es", NotificationKind::RepairReady, es_repair_ready),
    ("fi", NotificationKind::CostProposal, fi_cost_proposal),
    ("fi", NotificationKind::RepairReady, fi_repair_ready),
    ("ku", NotificationKind::CostProposal, ku_cost_proposal),
    ("ku", NotificationKind::RepairReady, ku_repair_ready),
    ("tr", NotificationKind::CostProposal, tr_cost_proposal),
    ("tr", NotificationKind::RepairReady, tr_repair_ready),
    ("pl", NotificationKind::CostProposal, pl_cost_proposal),
    ("pl", NotificationKind::RepairReady, pl_repair_ready),
    ("uk", NotificationKind::CostProposal, uk_cost_proposal),
    ("uk", NotificationKind::RepairReady, uk_repair_ready),
];

fn device_label(ticket: &ServiceTicket) -> String {
    match ticket.device_model.as_deref().filter(|m| !m.trim().is_empty()) {
        Some(model) => format!("{} {}", ticket.device_type, model),
        None => ticket.device_type.clone(),
    }
}

fn field_or<'a>(value: Option<&'a str>, fallback: &'a str) -> &'a str {
    value.filter(|v| !v.trim().is_empty()).unwrap_or(fallback)
}

fn final_cost(ticket: &ServiceTicket) -> Option<&str> {
    ticket.final_cost.as_deref().filter(|c| !c.trim().is_empty())
}

fn sv_cost_proposal(t: &ServiceTicket) -> RenderedTemplate {
    RenderedTemplate {
        subject: format!("Kostnadsförslag: Ärende {}", t.ticket_number),
        body: format!(
            "Hej {},\n\nVi har felsökt din {} med ärendenummer {} och har ett kostnadsförslag till dig.\n\nDiagnos:\n{}\n\nTotal kostnad för reparation: {} kr\n\nVänligen meddela oss om du vill gå vidare med reparationen.\n\nMed vänliga hälsningar,\nDitt serviceteam",
            t.customer_name,
            device_label(t),
            t.ticket_number,
            field_or(t.diagnosis.as_deref(), "[BESKRIV DIAGNOS HÄR]"),
            field_or(t.final_cost.as_deref(), "[PRIS]"),
        ),
    }
}

fn sv_repair_ready(t: &ServiceTicket) -> RenderedTemplate {
    let cost_line = final_cost(t)
        .map(|c| format!("\n\nDen slutgiltiga kostnaden för reparationen är {c} kr."))
        .unwrap_or_default();
    RenderedTemplate {
        subject: format!("Service klar: Ärende {}", t.ticket_number),
        body: format!(
            "Hej {},\n\nDin service gällande {} med ärendenummer {} är nu klar och enheten är redo att hämtas.{}\n\nUtförda åtgärder:\n{}\n\nVåra öppettider är:\nMån-Fre: 10:00 - 18:00\nLör: 10:00 - 15:00\n\nVänligen ta med ditt servicekvitto vid upphämtning.\n\nMed vänliga hälsningar,\nDitt serviceteam",
            t.customer_name,
            device_label(t),
            t.ticket_number,
            cost_line,
            field_or(t.work_done_summary.as_deref(), "Allmän service och felsökning."),
        ),
    }
}

fn en_cost_proposal(t: &ServiceTicket) -> RenderedTemplate {
    RenderedTemplate {
        subject: format!("Price Quote: Case {}", t.ticket_number),
        body: format!(
            "Hi {},\n\nWe have diagnosed your {} with case number {} and have a price quote for you.\n\nDiagnosis:\n{}\n\nTotal repair cost: {} kr\n\nPlease let us know if you wish to proceed with the repair.\n\nBest regards,\nYour Service Team",
            t.customer_name,
            device_label(t),
            t.ticket_number,
            field_or(t.diagnosis.as_deref(), "[DESCRIBE DIAGNOSIS HERE]"),
            field_or(t.final_cost.as_deref(), "[PRICE]"),
        ),
    }
}

fn en_repair_ready(t: &ServiceTicket) -> RenderedTemplate {
    let cost_line = final_cost(t)
        .map(|c| format!("\n\nThe final cost for the repair is {c} kr."))
        .unwrap_or_default();
    RenderedTemplate {
        subject: format!("Service Complete: Case {}", t.ticket_number),
        body: format!(
            "Hi {},\n\nYour service regarding {} with case number {} is now complete and the device is ready for pickup.{}\n\nWork performed:\n{}\n\nOur opening hours are:\nMon-Fri: 10:00 - 18:00\nSat: 10:00 - 15:00\n\nPlease bring your service receipt upon pickup.\n\nBest regards,\nYour Service Team",
            t.customer_name,
            device_label(t),
            t.ticket_number,
            cost_line,
            field_or(t.work_done_summary.as_deref(), "General service and troubleshooting."),
        ),
    }
}

fn ar_cost_proposal(t: &ServiceTicket) -> RenderedTemplate {
    RenderedTemplate {
        subject: format!("عرض سعر: حالة {}", t.ticket_number),
        body: format!(
            "مرحباً {}،\n\nلقد قمنا بتشخيص {} الخاص بك برقم الحالة {} ولدينا عرض سعر لك.\n\nالتشخيص:\n{}\n\nالتكلفة الإجمالية للإصلاح: {} kr\n\nيرجى إعلامنا إذا كنت ترغب في المتابعة مع الإصلاح.\n\nمع أطيب التحيات،\nفريق الخدمة الخاص بك",
            t.customer_name,
            device_label(t),
            t.ticket_number,
            field_or(t.diagnosis.as_deref(), "[صف التشخيص هنا]"),
            field_or(t.final_cost.as_deref(), "[السعر]"),
        ),
    }
}

fn ar_repair_ready(t: &ServiceTicket) -> RenderedTemplate {
    let cost_line = final_cost(t)
        .map(|c| format!("\n\nالتكلفة النهائية للإصلاح هي {c} kr."))
        .unwrap_or_default();
    RenderedTemplate {
        subject: format!("اكتملت الخدمة: حالة {}", t.ticket_number),
        body: format!(
            "مرحباً {}،\n\nخدمتك بخصوص {} برقم الحالة {} قد اكتملت الآن والجهاز جاهز للاستلام.{}\n\nالإجراءات المنجزة:\n{}\n\nساعات العمل لدينا هي:\nالاثنين - الجمعة: 10:00 - 18:00\nالسبت: 10:00 - 15:00\n\nيرجى إحضار إيصال الخدمة عند الاستلام.\n\nمع أطيب التحيات،\nفريق الخدمة الخاص بك",
            t.customer_name,
            device_label(t),
            t.ticket_number,
            cost_line,
            field_or(t.work_done_summary.as_deref(), "خدمة عامة واستكشاف الأخطاء وإصلاحها."),
        ),
    }
}

fn es_cost_proposal(t: &ServiceTicket) -> RenderedTemplate {
    RenderedTemplate {
        subject: format!("Cotización: Caso {}", t.ticket_number),
        body: format!(
            "Hola {},\n\nHemos diagnosticado su {} con número de caso {} y tenemos una cotización para usted.\n\nDiagnóstico:\n{}\n\nCosto total de la reparación: {} kr\n\nPor favor, infórmenos si desea proceder con la reparación.\n\nSaludos cordiales,\nSu equipo de servicio",
            t.customer_name,
            device_label(t),
            t.ticket_number,
            field_or(t.diagnosis.as_deref(), "[DESCRIBA EL DIAGNÓSTICO AQUÍ]"),
            field_or(t.final_cost.as_deref(), "[PRECIO]"),
        ),
    }
}

fn es_repair_ready(t: &ServiceTicket) -> RenderedTemplate {
    let cost_line = final_cost(t)
        .map(|c| format!("\n\nEl costo final de la reparación es {c} kr."))
        .unwrap_or_default();
    RenderedTemplate {
        subject: format!("Servicio Completado: Caso {}", t.ticket_number),
        body: format!(
            "Hola {},\n\nSu servicio para {} con número de caso {} está completo y el dispositivo está listo para ser recogido.{}\n\nTrabajo realizado:\n{}\n\nNuestro horario de atención es:\nLun-Vie: 10:00 - 18:00\nSáb: 10:00 - 15:00\n\nPor favor, traiga su recibo de servicio al recogerlo.\n\nSaludos cordiales,\nSu equipo de servicio",
            t.customer_name,
            device_label(t),
            t.ticket_number,
            cost_line,
            field_or(t.work_done_summary.as_deref(), "Servicio general y solución de problemas."),
        ),
    }
}

fn fi_cost_proposal(t: &ServiceTicket) -> RenderedTemplate {
    RenderedTemplate {
        subject: format!("Kustannusarvio: Tapaus {}", t.ticket_number),
        body: format!(
            "Hei {},\n\nOlemme tehneet vianmäärityksen laitteellesi {} tapausnumerolla {} ja meillä on sinulle kustannusarvio.\n\nDiagnoosi:\n{}\n\nKorjauksen kokonaiskustannus: {} kr\n\nIlmoitathan meille, jos haluat jatkaa korjauksen kanssa.\n\nTerveisin,\nHuoltotiimisi",
            t.customer_name,
            device_label(t),
            t.ticket_number,
            field_or(t.diagnosis.as_deref(), "[KUVA DIAGNOOSI TÄHÄN]"),
            field_or(t.final_cost.as_deref(), "[HINTA]"),
        ),
    }
}

fn fi_repair_ready(t: &ServiceTicket) -> RenderedTemplate {
    let cost_line = final_cost(t)
        .map(|c| format!("\n\nKorjauksen lopullinen hinta on {c} kr."))
        .unwrap_or_default();
    RenderedTemplate {
        subject: format!("Huolto valmis: Tapaus {}", t.ticket_number),
        body: format!(
            "Hei {},\n\nHuoltosi koskien {} tapausnumerolla {} on nyt valmis ja laite on noudettavissa.{}\n\nTehdyt toimenpiteet:\n{}\n\nAukioloaikamme ovat:\nMa-Pe: 10:00 - 18:00\nLa: 10:00 - 15:00\n\nOtathan huoltokuitin mukaan noutaessasi.\n\nTerveisin,\nHuoltotiimisi",
            t.customer_name,
            device_label(t),
            t.ticket_number,
            cost_line,
            field_or(t.work_done_summary.as_deref(), "Yleinen huolto ja vianmääritys."),
        ),
    }
}

fn ku_cost_proposal(t: &ServiceTicket) -> RenderedTemplate {
    RenderedTemplate {
        subject: format!("Pêşniyara Bihayê: Doz {}", t.ticket_number),
        body: format!(
            "Silav {},\n\nMe ji bo {} ya we bi hejmara dozê {} teşhîs kiriye û pêşniyarek bihayê ji bo we heye.\n\nTeşhîs:\n{}\n\nMesrefa giştî ya tamîrê: {} kr\n\nJi kerema xwe ji me re agahdar bikin heke hûn dixwazin bi tamîrê bidomînin.\n\nBi rêz,\nTîma we ya Xizmetê",
            t.customer_name,
            device_label(t),
            t.ticket_number,
            field_or(t.diagnosis.as_deref(), "[TEŞHÎSÊ LI VIR ŞIROVE BIKE]"),
            field_or(t.final_cost.as_deref(), "[BIHA]"),
        ),
    }
}

fn ku_repair_ready(t: &ServiceTicket) -> RenderedTemplate {
    let cost_line = final_cost(t)
        .map(|c| format!("\n\nMesrefa dawî ya tamîrê {c} kr e."))
        .unwrap_or_default();
    RenderedTemplate {
        subject: format!("Xizmet Temam Bû: Doz {}", t.ticket_number),
        body: format!(
            "Silav {},\n\nXizmeta we ya ji bo {} bi hejmara dozê {} niha temam bûye û amûr ji bo wergirtinê amade ye.{}\n\nKarê hatî kirin:\n{}\n\nDemjimêrên me yên vekirinê:\nDuşem-În: 10:00 - 18:00\nŞemî: 10:00 - 15:00\n\nJi kerema xwe meqbûza xizmetê bi xwe re bînin dema wergirtinê.\n\nBi rêz,\nTîma we ya Xizmetê",
            t.customer_name,
            device_label(t),
            t.ticket_number,
            cost_line,
            field_or(t.work_done_summary.as_deref(), "Xizmeta giştî û çareserkirina pirsgirêkan."),
        ),
    }
}

fn tr_cost_proposal(t: &ServiceTicket) -> RenderedTemplate {
    RenderedTemplate {
        subject: format!("Fiyat Teklifi: Vaka {}", t.ticket_number),
        body: format!(
            "Merhaba {},\n\n{} cihazınız için {} numaralı vaka ile ilgili arıza tespiti yaptık ve size bir fiyat teklifimiz var.\n\nTeşhis:\n{}\n\nToplam onarım maliyeti: {} kr\n\nOnarıma devam etmek isterseniz lütfen bize bildirin.\n\nSaygılarımızla,\nServis Ekibiniz",
            t.customer_name,
            device_label(t),
            t.ticket_number,
            field_or(t.diagnosis.as_deref(), "[TEŞHİSİ BURAYA AÇIKLAYIN]"),
            field_or(t.final_cost.as_deref(), "[FİYAT]"),
        ),
    }
}

fn tr_repair_ready(t: &ServiceTicket) -> RenderedTemplate {
    let cost_line = final_cost(t)
        .map(|c| format!("\n\nOnarımın nihai maliyeti {c} kr'dir."))
        .unwrap_or_default();
    RenderedTemplate {
        subject: format!("Servis Tamamlandı: Vaka {}", t.ticket_number),
        body: format!(
            "Merhaba {},\n\n{} cihazınızla ilgili {} numaralı servisiniz tamamlanmıştır ve cihaz teslim alınmaya hazırdır.{}\n\nYapılan işlemler:\n{}\n\nÇalışma saatlerimiz:\nPzt-Cum: 10:00 - 18:00\nCmt: 10:00 - 15:00\n\nLütfen teslim alırken servis fişinizi yanınızda getiriniz.\n\nSaygılarımızla,\nServis Ekibiniz",
            t.customer_name,
            device_label(t),
            t.ticket_number,
            cost_line,
            field_or(t.work_done_summary.as_deref(), "Genel servis ve sorun giderme."),
        ),
    }
}

fn pl_cost_proposal(t: &ServiceTicket) -> RenderedTemplate {
    RenderedTemplate {
        subject: format!("Wycena: Sprawa {}", t.ticket_number),
        body: format!(
            "Cześć {},\n\nZdiagnozowaliśmy Twoje urządzenie {} o numerze sprawy {} i mamy dla Ciebie wycenę.\n\nDiagnoza:\n{}\n\nCałkowity koszt naprawy: {} kr\n\nProsimy o informację, czy chcesz kontynuować naprawę.\n\nZ poważaniem,\nTwój Zespół Serwisowy",
            t.customer_name,
            device_label(t),
            t.ticket_number,
            field_or(t.diagnosis.as_deref(), "[OPISZ DIAGNOZĘ TUTAJ]"),
            field_or(t.final_cost.as_deref(), "[CENA]"),
        ),
    }
}

fn pl_repair_ready(t: &ServiceTicket) -> RenderedTemplate {
    let cost_line = final_cost(t)
        .map(|c| format!("\n\nOstateczny koszt naprawy wynosi {c} kr."))
        .unwrap_or_default();
    RenderedTemplate {
        subject: format!("Serwis Zakończony: Sprawa {}", t.ticket_number),
        body: format!(
            "Cześć {},\n\nTwój serwis dotyczący {} o numerze sprawy {} został zakończony, a urządzenie jest gotowe do odbioru.{}\n\nWykonane czynności:\n{}\n\nNasze godziny otwarcia:\nPn-Pt: 10:00 - 18:00\nSb: 10:00 - 15:00\n\nProsimy o zabranie potwierdzenia serwisowego przy odbiorze.\n\nZ poważaniem,\nTwój Zespół Serwisowy",
            t.customer_name,
            device_label(t),
            t.ticket_number,
            cost_line,
            field_or(t.work_done_summary.as_deref(), "Ogólny serwis i rozwiązywanie problemów."),
        ),
    }
}

fn uk_cost_proposal(t: &ServiceTicket) -> RenderedTemplate {
    RenderedTemplate {
        subject: format!("Цінова пропозиція: Справа {}", t.ticket_number),
        body: format!(
            "Вітаємо, {}!\n\nМи провели діагностику вашого пристрою {} з номером справи {} і маємо для вас цінову пропозицію.\n\nДіагноз:\n{}\n\nЗагальна вартість ремонту: {} kr\n\nБудь ласка, повідомте нам, якщо ви бажаєте продовжити ремонт.\n\nЗ повагою,\nВаша сервісна команда",
            t.customer_name,
            device_label(t),
            t.ticket_number,
            field_or(t.diagnosis.as_deref(), "[ОПИШІТЬ ДІАГНОЗ ТУТ]"),
            field_or(t.final_cost.as_deref(), "[ЦІНА]"),
        ),
    }
}

fn uk_repair_ready(t: &ServiceTicket) -> RenderedTemplate {
    let cost_line = final_cost(t)
        .map(|c| format!("\n\nКінцева вартість ремонту становить {c} kr."))
        .unwrap_or_default();
    RenderedTemplate {
        subject: format!("Обслуговування Завершено: Справа {}", t.ticket_number),
        body: format!(
            "Вітаємо, {}!\n\nВаше обслуговування щодо {} з номером справи {} завершено, і пристрій готовий до видачі.{}\n\nВиконані роботи:\n{}\n\nНаші години роботи:\nПн-Пт: 10:00 - 18:00\nСб: 10:00 - 15:00\n\nБудь ласка, візьміть із собою квитанцію про обслуговування при отриманні.\n\nЗ повагою,\nВаша сервісна команда",
            t.customer_name,
            device_label(t),
            t.ticket_number,
            cost_line,
            field_or(t.work_done_summary.as_deref(), "Загальне обслуговування та усунення несправностей."),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::test_utils::sample_ticket;

    #[test]
    fn test_swedish_cost_proposal_interpolates_ticket_fields() {
        let mut ticket = sample_ticket();
        ticket.diagnosis = Some("Trasig skärm".to_string());
        ticket.final_cost = Some("1500".to_string());

        let rendered = resolve(&ticket, NotificationKind::CostProposal, "sv");
        assert_eq!(
            rendered.subject,
            format!("Kostnadsförslag: Ärende {}", ticket.ticket_number)
        );
        assert!(rendered.body.contains("Trasig skärm"));
        assert!(rendered.body.contains("1500 kr"));
        assert!(rendered.body.contains(&ticket.customer_name));
    }

    #[test]
    fn test_cost_proposal_placeholders_when_fields_missing() {
        let mut ticket = sample_ticket();
        ticket.diagnosis = None;
        ticket.final_cost = None;

        let rendered = resolve(&ticket, NotificationKind::CostProposal, "sv");
        assert!(rendered.body.contains("[BESKRIV DIAGNOS HÄR]"));
        assert!(rendered.body.contains("[PRIS]"));
    }

    #[test]
    fn test_repair_ready_cost_paragraph_is_conditional() {
        let mut ticket = sample_ticket();
        ticket.final_cost = None;
        let without_cost = resolve(&ticket, NotificationKind::RepairReady, "en");
        assert!(!without_cost.body.contains("final cost"));

        ticket.final_cost = Some("900".to_string());
        let with_cost = resolve(&ticket, NotificationKind::RepairReady, "en");
        assert!(with_cost.body.contains("The final cost for the repair is 900 kr."));
    }

    #[test]
    fn test_unknown_language_falls_back_to_swedish() {
        let ticket = sample_ticket();
        let rendered = resolve(&ticket, NotificationKind::RepairReady, "de");
        assert!(rendered.subject.starts_with("Service klar"));
    }

    #[test]
    fn test_every_language_has_both_kinds() {
        for lang in ["sv", "en", "ar", "es", "fi", "ku", "tr", "pl", "uk"] {
            assert!(template_for(lang, NotificationKind::CostProposal).is_some());
            assert!(template_for(lang, NotificationKind::RepairReady).is_some());
        }
    }

    #[test]
    fn test_device_label_omits_missing_model() {
        let mut ticket = sample_ticket();
        ticket.device_type = "Laptop".to_string();
        ticket.device_model = None;
        assert_eq!(device_label(&ticket), "Laptop");

        ticket.device_model = Some("ThinkPad X1".to_string());
        assert_eq!(device_label(&ticket), "Laptop ThinkPad X1");
    }
}
