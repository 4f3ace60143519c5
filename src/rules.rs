//! Cascada de reglas por palabras clave: el modo que siempre está disponible.
//!
//! Las reglas se evalúan en orden y gana la primera que coincide. El orden es
//! parte del comportamiento: hay disparadores compartidos (p. ej. `fatigue`
//! en tiroides y en anemia) y siempre resuelve la regla anterior.

use std::sync::LazyLock;

use anyhow::Result;
use regex::Regex;
use tracing::debug;

use crate::engine::Recommender;
use crate::models::{Recommendation, SymptomQuery};

pub const RULE_NOTES: &str =
    "This is a rule-based recommendation. Final prescription authority lies with the licensed physician.";

/// Texto fijo que produce una regla.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuleOutcome {
    pub diagnosis: &'static str,
    pub medicine: &'static str,
    pub alternative: &'static str,
    pub lifestyle: &'static str,
    pub red_flags: &'static str,
    pub follow_up: &'static str,
}

/// Un paso de la cascada: patrón compilado y su resultado.
pub struct CascadeRule {
    pub key: &'static str,
    regex: Regex,
    pub outcome: RuleOutcome,
}

impl CascadeRule {
    pub fn matches(&self, lowered: &str) -> bool {
        self.regex.is_match(lowered)
    }
}

pub const DEFAULT_OUTCOME: RuleOutcome = RuleOutcome {
    diagnosis: "General symptomatic care",
    medicine: "- Paracetamol 500 mg: Every 6 hours as needed",
    alternative: "- Ibuprofen 200 mg: Every 6-8 hours if no contraindications",
    lifestyle: "Hydration, rest, monitor symptoms.",
    red_flags: "Persistent symptoms more than 3 days, high fever, severe pain.",
    follow_up: "Review in 48-72 hours if no improvement.",
};

static CASCADE: LazyLock<Vec<CascadeRule>> = LazyLock::new(|| {
    vec![
        rule(
            "fever",
            r"\bfever\b|\btemperature\b|\bpyrexia\b",
            RuleOutcome {
                diagnosis: "Acute febrile illness",
                medicine: "- Paracetamol 500 mg: Every 6 hours for fever\n- Maintain hydration with ORS",
                alternative: "- Ibuprofen 400 mg: Every 8 hours if no contraindications\n- Cold compress",
                lifestyle: "Fluids (2-3 liters/day), rest, monitor temperature.",
                red_flags: "Fever >39°C for >3 days, severe headache, rash, breathing difficulty, altered consciousness.",
                follow_up: "Review in 48 hours if fever persists.",
            },
        ),
        rule(
            "diabetes",
            r"\bdiabetes\b|\bhigh.*sugar\b|\bhyperglycemi\b",
            RuleOutcome {
                diagnosis: "Type 2 Diabetes Mellitus",
                medicine: "- Metformin 500 mg: BD with meals (start low, titrate up)\n- Monitor blood glucose regularly",
                alternative: "- Glimepiride 1-2 mg OD (if metformin not tolerated)\n- DPP-4 inhibitors (Sitagliptin 100 mg OD)",
                lifestyle: "Low glycemic index diet, 150 min exercise/week, weight loss (if BMI >25), avoid refined sugars.",
                red_flags: "Glucose >400 mg/dL, confusion, chest pain, excessive thirst, fruity breath odor, rapid breathing.",
                follow_up: "HbA1c every 3 months, annual eye/foot examination.",
            },
        ),
        rule(
            "cold",
            r"\bcough\b|\bcold\b|\bsneez\b|\brunny.*nose\b|\bnasal.*congest\b",
            RuleOutcome {
                diagnosis: "Upper Respiratory Tract Infection (URTI)",
                medicine: "- Cetirizine 10 mg: Once daily at bedtime\n- Dextromethorphan cough syrup: 10 mL TDS\n- Saline nasal drops",
                alternative: "- Loratadine 10 mg OD (non-drowsy)\n- Steam inhalation 2-3 times daily\n- Honey (1 tsp) for cough",
                lifestyle: "Rest, warm fluids (tea, soup), avoid cold beverages, humidify room air.",
                red_flags: "High fever >38.5°C, chest pain, difficulty breathing, persistent symptoms >7 days.",
                follow_up: "Review if symptoms persist beyond 5-7 days or worsen.",
            },
        ),
        rule(
            "headache",
            r"\bheadache\b|\bmigrain\b|\bhead.*pain\b",
            RuleOutcome {
                diagnosis: "Tension headache / Migraine",
                medicine: "- Paracetamol 500 mg: Every 6-8 hours (max 4g/day)\n- For migraine: Sumatriptan 50 mg as needed",
                alternative: "- Ibuprofen 400 mg TDS\n- Naproxen 250 mg BD\n- Rest in dark, quiet room",
                lifestyle: "Stress management, regular sleep (7-8 hrs), hydration, avoid triggers (caffeine, alcohol, screens).",
                red_flags: "Sudden severe headache (thunderclap), vision changes, confusion, neck stiffness, fever with headache.",
                follow_up: "Review if headaches increase in frequency or severity. Consider CT if red flags present.",
            },
        ),
        rule(
            "hypertension",
            r"\bhypertension\b|\bhigh.*blood.*pressure\b|\bhbp\b",
            RuleOutcome {
                diagnosis: "Essential Hypertension",
                medicine: "- Amlodipine 5 mg: Once daily\n- Monitor BP regularly (home monitoring)",
                alternative: "- Losartan 50 mg OD (ARB)\n- Enalapril 5 mg OD (ACE inhibitor)\n- Hydrochlorothiazide 12.5 mg OD",
                lifestyle: "Low sodium diet (<2g/day), DASH diet, regular exercise (30 min/day), weight reduction, limit alcohol, quit smoking.",
                red_flags: "BP >180/120, chest pain, severe headache, vision changes, shortness of breath, nosebleeds.",
                follow_up: "BP monitoring weekly initially, then monthly. Review medications every 3 months.",
            },
        ),
        rule(
            "asthma",
            r"\basthma\b|\bwheezing\b|\bshortness.*breath\b|\bbreathe\b",
            RuleOutcome {
                diagnosis: "Asthma / Reactive Airway Disease",
                medicine: "- Salbutamol inhaler (2 puffs): PRN for symptoms\n- Budesonide inhaler 200 mcg: BD (controller)",
                alternative: "- Montelukast 10 mg: Once daily at bedtime\n- Formoterol + Budesonide combination inhaler",
                lifestyle: "Avoid triggers (dust, smoke, cold air), breathing exercises, maintain healthy weight, flu vaccination.",
                red_flags: "Severe difficulty breathing, blue lips/fingers, unable to speak full sentences, chest tightness not relieved by inhaler.",
                follow_up: "Review in 2 weeks, peak flow monitoring, pulmonary function tests if persistent.",
            },
        ),
        rule(
            "gastric",
            r"\bgastric\b|\bacid\b|\bheart.*burn\b|\bindigestion\b|\bstomach.*pain\b|\bepigastric\b",
            RuleOutcome {
                diagnosis: "Gastritis / Gastroesophageal Reflux Disease (GERD)",
                medicine: "- Omeprazole 20 mg: Once daily before breakfast\n- Antacid (Magaldrate) syrup: 10 mL after meals",
                alternative: "- Pantoprazole 40 mg OD\n- Ranitidine 150 mg BD\n- Sucralfate 1g QID",
                lifestyle: "Small frequent meals, avoid spicy/fatty foods, no late meals (3 hrs before bed), elevate head while sleeping, avoid alcohol/smoking.",
                red_flags: "Severe abdominal pain, vomiting blood, black tarry stools, weight loss, difficulty swallowing.",
                follow_up: "Review in 4 weeks. Consider endoscopy if symptoms persist or red flags present.",
            },
        ),
        rule(
            "allergy",
            r"\ballerg\b|\brash\b|\bitch\b|\bhives\b|\burticaria\b",
            RuleOutcome {
                diagnosis: "Allergic Reaction / Urticaria",
                medicine: "- Cetirizine 10 mg: Once daily\n- Hydrocortisone cream 1%: Apply BD to affected areas\n- Avoid known allergens",
                alternative: "- Loratadine 10 mg OD\n- Fexofenadine 120 mg OD (non-sedating)\n- Calamine lotion for local relief",
                lifestyle: "Identify and avoid triggers, wear loose cotton clothing, avoid hot showers, keep skin moisturized.",
                red_flags: "Difficulty breathing, swelling of face/throat/tongue, rapid pulse, dizziness, loss of consciousness (anaphylaxis).",
                follow_up: "Review in 1 week. Allergy testing if recurrent. Carry epinephrine auto-injector if severe allergies.",
            },
        ),
        rule(
            "arthritis",
            r"\barthritis\b|\bjoint.*pain\b|\bknee.*pain\b|\bback.*pain\b|\bosteo\b",
            RuleOutcome {
                diagnosis: "Osteoarthritis / Degenerative Joint Disease",
                medicine: "- Ibuprofen 400 mg: TDS after meals\n- Glucosamine 1500 mg + Chondroitin 1200 mg: Once daily\n- Topical diclofenac gel",
                alternative: "- Naproxen 250 mg BD\n- Paracetamol 1g TDS\n- Hot/cold therapy\n- Capsaicin cream 0.025%",
                lifestyle: "Weight reduction if overweight, low-impact exercises (swimming, cycling), physical therapy, avoid prolonged standing.",
                red_flags: "Severe pain, joint swelling/warmth/redness, fever, inability to bear weight, deformity.",
                follow_up: "Review in 2 weeks. X-rays if severe. Consider physiotherapy referral.",
            },
        ),
        rule(
            "mental_health",
            r"\banxiety\b|\bdepression\b|\bstress\b|\bpanic\b|\bmental\b|\bsad\b|\bworr\b",
            RuleOutcome {
                diagnosis: "Anxiety / Depression - Requires Mental Health Evaluation",
                medicine: "- Escitalopram 10 mg: Once daily (after psychiatric evaluation)\n- Consider counseling/psychotherapy first",
                alternative: "- Sertraline 50 mg OD\n- Cognitive Behavioral Therapy (CBT)\n- Mindfulness-based therapy",
                lifestyle: "Regular exercise (30 min/day), adequate sleep (7-9 hrs), social support, relaxation techniques (meditation, yoga), limit caffeine/alcohol.",
                red_flags: "Suicidal thoughts, self-harm, severe panic attacks, inability to perform daily activities, hallucinations.",
                follow_up: "Psychiatric referral recommended. Review in 1 week initially, then every 2-4 weeks.",
            },
        ),
        rule(
            "uti",
            r"\buti\b|\burinary\b|\bburn.*urin\b|\bfrequent.*urin\b|\bdysuria\b",
            RuleOutcome {
                diagnosis: "Urinary Tract Infection (UTI)",
                medicine: "- Nitrofurantoin 100 mg: BD for 5 days\n- Increase fluid intake (2-3 liters/day)",
                alternative: "- Trimethoprim 200 mg BD for 3 days\n- Ciprofloxacin 500 mg BD for 3 days\n- Cranberry supplements",
                lifestyle: "Hydration (8-10 glasses water/day), urinate frequently, avoid holding urine, proper hygiene, cranberry juice.",
                red_flags: "High fever, flank pain, blood in urine, nausea/vomiting, confusion (especially in elderly).",
                follow_up: "Review if symptoms persist after 48 hours. Urine culture if recurrent UTIs.",
            },
        ),
        rule(
            "thyroid",
            r"\bthyroid\b|\bhypothyroid\b|\bhyperthyroid\b|\bfatigue\b|\bweight.*gain\b",
            RuleOutcome {
                diagnosis: "Thyroid Disorder (Requires lab confirmation)",
                medicine: "- Levothyroxine 50 mcg: Once daily (for hypothyroidism, after TSH confirmation)\n- Take on empty stomach",
                alternative: "- Dosage adjustment based on TSH levels\n- Regular monitoring required",
                lifestyle: "Regular medication timing, avoid soy/calcium supplements near medication time, balanced diet, regular exercise.",
                red_flags: "Severe fatigue, rapid heart rate, tremors, significant weight changes, neck swelling.",
                follow_up: "TSH levels every 6-8 weeks initially, then every 6 months once stable.",
            },
        ),
        rule(
            "skin",
            r"\bskin.*infection\b|\bfungal\b|\bringworm\b|\beczema\b|\bdermatitis\b",
            RuleOutcome {
                diagnosis: "Skin Infection / Dermatitis",
                medicine: "- Clotrimazole cream 1%: Apply BD for fungal infections\n- Hydrocortisone cream 1%: BD for inflammation (max 7 days)",
                alternative: "- Terbinafine cream 1% BD\n- Mupirocin ointment (if bacterial)\n- Calamine lotion for soothing",
                lifestyle: "Keep area clean and dry, avoid tight clothing, change clothes daily, avoid sharing towels.",
                red_flags: "Spreading infection, fever, pus discharge, severe pain, no improvement in 1 week.",
                follow_up: "Review in 1 week if no improvement. Skin scraping/culture if persistent.",
            },
        ),
        rule(
            "anemia",
            r"\banemia\b|\banemic\b|\blow.*iron\b|\bfatigue\b|\bpale\b|\bdizz\b",
            RuleOutcome {
                diagnosis: "Iron Deficiency Anemia (Requires lab confirmation)",
                medicine: "- Ferrous sulfate 325 mg: Once daily with vitamin C\n- Take on empty stomach or with orange juice",
                alternative: "- Ferrous gluconate 300 mg OD (if GI side effects)\n- Iron polymaltose complex\n- Vitamin B12 if deficient",
                lifestyle: "Iron-rich foods (red meat, spinach, lentils, fortified cereals), vitamin C with meals (enhances absorption), avoid tea/coffee with meals.",
                red_flags: "Severe fatigue, chest pain, shortness of breath, rapid heartbeat, severe dizziness, blood in stool.",
                follow_up: "Hemoglobin check in 4-6 weeks. Continue iron for 3-6 months to replenish stores.",
            },
        ),
        rule(
            "insomnia",
            r"\binsomnia\b|\bsleep\b|\bcan't.*sleep\b|\bawake\b",
            RuleOutcome {
                diagnosis: "Insomnia / Sleep Disorder",
                medicine: "- Melatonin 3 mg: 30 minutes before bedtime\n- Short-term: Zolpidem 5 mg (if severe, max 2 weeks)",
                alternative: "- Diphenhydramine 25 mg at bedtime\n- Trazodone 50 mg (if depression present)\n- CBT for insomnia (CBT-I)",
                lifestyle: "Sleep hygiene: regular sleep schedule, dark/cool room, avoid screens 1 hr before bed, no caffeine after 2 PM, relaxation techniques.",
                red_flags: "Sleep apnea symptoms (snoring, gasping), severe daytime impairment, depression with insomnia.",
                follow_up: "Review in 2 weeks. Sleep study if suspected sleep apnea.",
            },
        ),
    ]
});

fn rule(key: &'static str, pattern: &str, outcome: RuleOutcome) -> CascadeRule {
    CascadeRule {
        key,
        regex: Regex::new(pattern).expect("Patrón de la cascada inválido"),
        outcome,
    }
}

/// Reglas de la cascada en orden de evaluación.
pub fn cascade() -> &'static [CascadeRule] {
    &CASCADE
}

/// Primera regla que coincide con el texto (ya en minúsculas), si la hay.
pub fn first_match(lowered: &str) -> Option<&'static CascadeRule> {
    cascade().iter().find(|r| r.matches(lowered))
}

/// Recomendador determinista por reglas. No tiene estado.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleCascade;

impl RuleCascade {
    pub fn evaluate(&self, query: &SymptomQuery) -> Recommendation {
        let lowered = query.symptoms.to_lowercase();
        let outcome = match first_match(&lowered) {
            Some(rule) => {
                debug!("Regla '{}' aplicada.", rule.key);
                rule.outcome
            }
            None => {
                debug!("Ninguna regla coincide; recomendación genérica.");
                DEFAULT_OUTCOME
            }
        };

        Recommendation {
            diagnosis: outcome.diagnosis.to_string(),
            medicine: outcome.medicine.to_string(),
            alternative: outcome.alternative.to_string(),
            lifestyle: outcome.lifestyle.to_string(),
            red_flags: outcome.red_flags.to_string(),
            follow_up: outcome.follow_up.to_string(),
            notes: RULE_NOTES.to_string(),
            predicted_category: None,
            confidence: None,
        }
    }
}

impl Recommender for RuleCascade {
    fn name(&self) -> &'static str {
        "rules"
    }

    fn recommend(&self, query: &SymptomQuery) -> Result<Recommendation> {
        Ok(self.evaluate(query))
    }
}
